use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use gamewire::utils::crypto::Crypto;
use gamewire::{Buffer, Connection, Dispatcher};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Wire = Arc<Mutex<Vec<Vec<u8>>>>;

fn endpoint(encrypted: bool) -> (Connection, Wire) {
    let wire: Wire = Arc::default();
    let sent = Arc::clone(&wire);
    let mut connection = Connection::new(
        move |buffer: &Buffer| sent.lock().unwrap_or_else(|e| e.into_inner()).push(buffer.payload().to_vec()),
        Dispatcher::new()
            .with_handler(1, |buffer, _| buffer.get_var_u32().map(|_| ()))
            .unwrap_or_default(),
    );
    if encrypted {
        if let Ok(crypto) = Crypto::new(&[3u8; 32]) {
            connection.enable_encryption(crypto);
        }
    }
    (connection, wire)
}

fn carry(wire: &Wire, to: &mut Connection) {
    let datagrams: Vec<Vec<u8>> = wire.lock().unwrap_or_else(|e| e.into_inner()).drain(..).collect();
    for datagram in datagrams {
        let _ = to.receive_datagram(&datagram);
    }
}

fn bench_reliable_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("reliable_round_trip");
    group.throughput(Throughput::Elements(16));

    for encrypted in [false, true] {
        let name = if encrypted { "encrypted" } else { "plain" };
        group.bench_function(name, |b| {
            let (mut client, client_wire) = endpoint(encrypted);
            let (mut server, server_wire) = endpoint(encrypted);
            let mut tick = 0u32;
            b.iter(|| {
                for message in 0..16u32 {
                    let _ = client.send_reliable(|buffer, _| {
                        buffer.put_u8(1);
                        buffer.put_var_u32(message);
                    });
                }
                tick = tick.wrapping_add(1);
                client.update(Duration::from_millis(1), tick);
                carry(&client_wire, &mut server);
                server.update(Duration::from_millis(1), tick);
                carry(&server_wire, &mut client);
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_reliable_round_trip);
criterion_main!(benches);
