use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use chrono::{NaiveDate, NaiveTime, TimeDelta};
use rand::Rng;
use tokio_postgres::{Config, NoTls};
use ulid::Ulid;

const OPENING: u32 = 11;
const SLOTS_PER_DAY: u32 = 20; // 11:00 to 20:30 every 30 minutes

async fn connect(host: &str, port: u16, venue: &str) -> tokio_postgres::Client {
    let mut config = Config::new();
    config
        .host(host)
        .port(port)
        .dbname(venue)
        .user("admin")
        .password("tablebook");

    let (client, conn) = config.connect(NoTls).await.expect("connect failed");
    tokio::spawn(async move {
        if let Err(e) = conn.await {
            eprintln!("connection error: {e}");
        }
    });
    client
}

fn fresh_venue() -> String {
    format!("bench_{}", Ulid::new())
}

fn percentile(sorted: &[Duration], p: f64) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let idx = ((sorted.len() as f64) * p / 100.0) as usize;
    sorted[idx.min(sorted.len() - 1)]
}

fn print_latency(label: &str, latencies: &mut [Duration]) {
    if latencies.is_empty() {
        println!("  {label}: no samples");
        return;
    }
    latencies.sort();
    let total: Duration = latencies.iter().sum();
    let avg = total / latencies.len() as u32;
    println!("  {label}:");
    println!(
        "    n={}, avg={:.2}ms, p50={:.2}ms, p95={:.2}ms, p99={:.2}ms, max={:.2}ms",
        latencies.len(),
        avg.as_secs_f64() * 1000.0,
        percentile(latencies, 50.0).as_secs_f64() * 1000.0,
        percentile(latencies, 95.0).as_secs_f64() * 1000.0,
        percentile(latencies, 99.0).as_secs_f64() * 1000.0,
        latencies[latencies.len() - 1].as_secs_f64() * 1000.0,
    );
}

/// The i-th reservation slot: walks through the day's slots, then the next day.
fn slot(i: u32) -> (NaiveDate, NaiveTime) {
    let base = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap_or_default();
    let date = base + TimeDelta::days((i / SLOTS_PER_DAY) as i64);
    let minutes = (i % SLOTS_PER_DAY) * 30;
    let time = NaiveTime::from_hms_opt(OPENING + minutes / 60, minutes % 60, 0).unwrap_or_default();
    (date, time)
}

fn booking_sql(i: u32, party_size: u32) -> String {
    let (date, time) = slot(i);
    format!(
        "INSERT INTO reservations (date, time, party_size, name, surname, phone) \
         VALUES ('{date}', '{}', {party_size}, 'Bench', 'Guest', '+4915112345678')",
        time.format("%H:%M")
    )
}

/// Accepted or rejected by a blocked window both count as served.
async fn book(client: &tokio_postgres::Client, i: u32, party_size: u32) -> bool {
    match client.batch_execute(&booking_sql(i, party_size)).await {
        Ok(()) => true,
        Err(e) => {
            let code = e.as_db_error().map(|db| db.code().code().to_string());
            assert_eq!(code.as_deref(), Some("23P01"), "unexpected error: {e}");
            false
        }
    }
}

async fn seed_catalog(client: &tokio_postgres::Client, n_items: usize) {
    let category = Ulid::new();
    client
        .batch_execute(&format!(
            "INSERT INTO categories (id, title) VALUES ('{category}', 'Bench')"
        ))
        .await
        .unwrap();
    for i in 0..n_items {
        client
            .batch_execute(&format!(
                "INSERT INTO items (title, price, category_id) VALUES ('Item {i:04}', 4.50, '{category}')"
            ))
            .await
            .unwrap();
    }
}

async fn phase1_sequential(host: &str, port: u16) {
    let client = connect(host, port, &fresh_venue()).await;

    let n = 2000;
    let mut latencies = Vec::with_capacity(n as usize);
    let mut rejected = 0;
    let start = Instant::now();

    for i in 0..n {
        let t = Instant::now();
        if !book(&client, i / 4, 4).await {
            rejected += 1;
        }
        latencies.push(t.elapsed());
    }

    let elapsed = start.elapsed();
    let ops = n as f64 / elapsed.as_secs_f64();
    println!(
        "  {n} reservations ({rejected} rejected) in {:.2}s = {ops:.0} ops/sec",
        elapsed.as_secs_f64()
    );
    print_latency("write latency", &mut latencies);
}

async fn phase2_concurrent(host: &str, port: u16) {
    let n_tasks = 10;
    let n_per_task = 200;

    let start = Instant::now();
    let mut handles = Vec::new();

    for _ in 0..n_tasks {
        let host = host.to_string();
        handles.push(tokio::spawn(async move {
            let client = connect(&host, port, &fresh_venue()).await;
            for j in 0..n_per_task {
                let party_size = rand::thread_rng().gen_range(1..=6);
                book(&client, j / 3, party_size).await;
            }
        }));
    }

    for h in handles {
        h.await.unwrap();
    }

    let elapsed = start.elapsed();
    let total = n_tasks * n_per_task;
    let ops = total as f64 / elapsed.as_secs_f64();
    println!(
        "  {n_tasks} venues x {n_per_task} reservations = {total} total in {:.2}s = {ops:.0} ops/sec",
        elapsed.as_secs_f64()
    );
}

async fn phase3_read_under_load(host: &str, port: u16) {
    let venue = fresh_venue();

    let setup_client = connect(host, port, &venue).await;
    for i in 0..200 {
        book(&setup_client, i / 5, 6).await;
    }
    seed_catalog(&setup_client, 100).await;
    drop(setup_client);

    // Writers share the venue so every write triggers a refresh readers contend with.
    let stop = Arc::new(AtomicBool::new(false));
    let mut writer_handles = Vec::new();
    for w in 0..5u32 {
        let host = host.to_string();
        let venue = venue.clone();
        let stop = stop.clone();
        writer_handles.push(tokio::spawn(async move {
            let client = connect(&host, port, &venue).await;
            let mut i = 0u32;
            while !stop.load(Ordering::Relaxed) {
                book(&client, 1000 + w * 10_000 + i / 2, 3).await;
                i += 1;
            }
        }));
    }

    let n_readers = 10;
    let reads_per_reader = 500;
    let mut reader_handles = Vec::new();

    for r in 0..n_readers {
        let host = host.to_string();
        let venue = venue.clone();
        reader_handles.push(tokio::spawn(async move {
            let client = connect(&host, port, &venue).await;
            let mut windows = Vec::with_capacity(reads_per_reader);
            let mut items = Vec::with_capacity(reads_per_reader);
            for i in 0..reads_per_reader {
                let (date, _) = slot((r * reads_per_reader + i) as u32 % 200);
                let t = Instant::now();
                client
                    .simple_query(&format!("SELECT * FROM blocked_windows WHERE date = '{date}'"))
                    .await
                    .unwrap();
                windows.push(t.elapsed());

                let t = Instant::now();
                client
                    .simple_query("SELECT * FROM items WHERE title LIKE 'Item 00%' LIMIT 10")
                    .await
                    .unwrap();
                items.push(t.elapsed());
            }
            (windows, items)
        }));
    }

    let mut window_latencies = Vec::new();
    let mut item_latencies = Vec::new();
    for h in reader_handles {
        let (w, i) = h.await.unwrap();
        window_latencies.extend(w);
        item_latencies.extend(i);
    }

    stop.store(true, Ordering::Relaxed);
    for h in writer_handles {
        let _ = h.await;
    }

    print_latency("blocked window query", &mut window_latencies);
    print_latency("item prefix query", &mut item_latencies);
}

async fn phase4_connection_storm(host: &str, port: u16) {
    let n_conns = 50;
    let ops_per_conn = 10;

    let start = Instant::now();
    let mut handles = Vec::new();
    let success = Arc::new(AtomicUsize::new(0));

    for _ in 0..n_conns {
        let host = host.to_string();
        let success = success.clone();
        handles.push(tokio::spawn(async move {
            let client = connect(&host, port, &fresh_venue()).await;
            for i in 0..ops_per_conn {
                book(&client, i, 2).await;
            }
            success.fetch_add(1, Ordering::Relaxed);
        }));
    }

    for h in handles {
        let _ = h.await;
    }

    let elapsed = start.elapsed();
    let ok = success.load(Ordering::Relaxed);
    println!(
        "  {n_conns} connections, {ops_per_conn} ops each: {ok}/{n_conns} succeeded in {:.2}s",
        elapsed.as_secs_f64()
    );
}

#[tokio::main]
async fn main() {
    let host = std::env::var("TABLEBOOK_HOST").unwrap_or_else(|_| "127.0.0.1".into());
    let port: u16 = std::env::var("TABLEBOOK_PORT")
        .unwrap_or_else(|_| "5433".into())
        .parse()
        .expect("invalid TABLEBOOK_PORT");

    println!("=== tablebook stress benchmark ===");
    println!("target: {host}:{port}\n");

    // Each phase opens fresh venues (unique dbname) to avoid interference

    println!("[phase 1] sequential reservation throughput");
    phase1_sequential(&host, port).await;

    println!("\n[phase 2] concurrent reservations across venues");
    phase2_concurrent(&host, port).await;

    println!("\n[phase 3] read latency under write load");
    phase3_read_under_load(&host, port).await;

    println!("\n[phase 4] connection storm");
    phase4_connection_storm(&host, port).await;

    println!("\n=== done ===");
}
