// =============================================================================
// bot-detect — Load Test Tool
// =============================================================================
// Generates synthetic detect requests — a mix of clean browser traffic,
// known-bad UAs, and security-tool signatures — and posts them to a
// running demo server's /v1/detect endpoint at configurable rates.
// =============================================================================

use clap::Parser;
use rand::Rng;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Serialize)]
struct DetectRequestBody {
    method: String,
    path: String,
    ip: String,
    user_agent: String,
    headers: BTreeMap<String, String>,
    is_websocket_upgrade: bool,
}

const CLEAN_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0",
];

const BOT_USER_AGENTS: &[&str] = &[
    "python-requests/2.31.0",
    "curl/8.6.0",
    "sqlmap/1.8#stable",
    "Go-http-client/1.1",
];

const PATHS: &[&str] = &["/", "/search", "/api/products", "/checkout", "/wp-admin/setup.php"];

#[derive(Parser)]
#[command(name = "bot-detect-loadtest")]
#[command(about = "Load test tool for the bot-detection demo server")]
struct Args {
    /// Server base URL
    #[arg(long, default_value = "http://localhost:8080")]
    url: String,

    /// Requests per second
    #[arg(long, default_value_t = 100)]
    rate: u32,

    /// Duration in seconds
    #[arg(long, default_value_t = 30)]
    duration: u64,

    /// Number of distinct simulated client IPs
    #[arg(long, default_value_t = 200)]
    clients: usize,

    /// Fraction of traffic that looks like a bot (0.0-1.0)
    #[arg(long, default_value_t = 0.15)]
    bot_fraction: f64,
}

struct Counters {
    sent: AtomicU64,
    allowed: AtomicU64,
    challenged: AtomicU64,
    throttled: AtomicU64,
    blocked: AtomicU64,
    masked: AtomicU64,
    network_error: AtomicU64,
    latency_sum_us: AtomicU64,
}

impl Counters {
    fn new() -> Self {
        Self {
            sent: AtomicU64::new(0),
            allowed: AtomicU64::new(0),
            challenged: AtomicU64::new(0),
            throttled: AtomicU64::new(0),
            blocked: AtomicU64::new(0),
            masked: AtomicU64::new(0),
            network_error: AtomicU64::new(0),
            latency_sum_us: AtomicU64::new(0),
        }
    }
}

fn build_request(rng: &mut impl Rng, client_id: usize, bot_fraction: f64) -> DetectRequestBody {
    let is_bot = rng.gen_bool(bot_fraction);
    let user_agent = if is_bot {
        BOT_USER_AGENTS[rng.gen_range(0..BOT_USER_AGENTS.len())]
    } else {
        CLEAN_USER_AGENTS[rng.gen_range(0..CLEAN_USER_AGENTS.len())]
    };
    let path = if is_bot && rng.gen_bool(0.2) {
        "/wp-admin/setup.php"
    } else {
        PATHS[rng.gen_range(0..PATHS.len())]
    };

    let mut headers = BTreeMap::new();
    headers.insert("accept".to_string(), "text/html,application/json".to_string());
    if !is_bot {
        headers.insert("accept-language".to_string(), "en-US,en;q=0.9".to_string());
    }

    DetectRequestBody {
        method: "GET".to_string(),
        path: path.to_string(),
        ip: format!("198.51.100.{}", (client_id % 250) + 1),
        user_agent: user_agent.to_string(),
        headers,
        is_websocket_upgrade: false,
    }
}

fn main() {
    let args = Args::parse();

    println!("=== Bot Detection Load Test ===");
    println!("Target:       {}/v1/detect", args.url);
    println!("Rate:         {} req/s", args.rate);
    println!("Duration:     {}s", args.duration);
    println!("Clients:      {}", args.clients);
    println!("Bot fraction: {:.0}%", args.bot_fraction * 100.0);
    println!();

    let health_url = format!("{}/health", args.url);
    match reqwest::blocking::get(&health_url) {
        Ok(r) if r.status().is_success() => println!("Server health: OK"),
        Ok(r) => {
            eprintln!("Server health check failed: {}", r.status());
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Cannot reach server: {}", e);
            std::process::exit(1);
        }
    }

    let counters = Arc::new(Counters::new());
    let detect_url = format!("{}/v1/detect", args.url);

    let interval = Duration::from_micros(1_000_000 / args.rate as u64);
    let deadline = Instant::now() + Duration::from_secs(args.duration);

    println!("\nSending...\n");
    let start = Instant::now();

    let client = reqwest::blocking::Client::builder().timeout(Duration::from_secs(10)).build().unwrap();

    let mut rng = rand::thread_rng();
    let mut tick = 0u64;

    while Instant::now() < deadline {
        let client_id = (tick as usize) % args.clients;
        let body = build_request(&mut rng, client_id, args.bot_fraction);

        let req_start = Instant::now();
        counters.sent.fetch_add(1, Ordering::Relaxed);

        match client.post(&detect_url).json(&body).send() {
            Ok(resp) => {
                let lat = req_start.elapsed().as_micros() as u64;
                counters.latency_sum_us.fetch_add(lat, Ordering::Relaxed);

                if resp.status().is_success() {
                    match resp.json::<serde_json::Value>() {
                        Ok(payload) => {
                            let action = payload.get("action").and_then(|v| v.as_str()).unwrap_or("Unknown");
                            match action {
                                "Allow" | "LogOnly" => {
                                    counters.allowed.fetch_add(1, Ordering::Relaxed);
                                }
                                "Challenge" => {
                                    counters.challenged.fetch_add(1, Ordering::Relaxed);
                                }
                                "Throttle" => {
                                    counters.throttled.fetch_add(1, Ordering::Relaxed);
                                }
                                "Block" => {
                                    counters.blocked.fetch_add(1, Ordering::Relaxed);
                                }
                                "MaskResponse" => {
                                    counters.masked.fetch_add(1, Ordering::Relaxed);
                                }
                                _ => {}
                            }
                        }
                        Err(_) => {
                            counters.network_error.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                } else {
                    counters.network_error.fetch_add(1, Ordering::Relaxed);
                }
            }
            Err(_) => {
                counters.network_error.fetch_add(1, Ordering::Relaxed);
            }
        }

        tick += 1;

        if tick % 500 == 0 {
            let elapsed = start.elapsed().as_secs_f64();
            let sent = counters.sent.load(Ordering::Relaxed);
            println!(
                "  [{:.1}s] sent={} allowed={} challenged={} throttled={} blocked={} masked={} err={} ({:.0} req/s)",
                elapsed,
                sent,
                counters.allowed.load(Ordering::Relaxed),
                counters.challenged.load(Ordering::Relaxed),
                counters.throttled.load(Ordering::Relaxed),
                counters.blocked.load(Ordering::Relaxed),
                counters.masked.load(Ordering::Relaxed),
                counters.network_error.load(Ordering::Relaxed),
                sent as f64 / elapsed,
            );
        }

        let target = Duration::from_micros(tick * interval.as_micros() as u64);
        let actual = start.elapsed();
        if actual < target {
            std::thread::sleep(target - actual);
        }
    }

    let elapsed = start.elapsed();
    let sent = counters.sent.load(Ordering::Relaxed);
    let avg_lat = if sent > 0 { counters.latency_sum_us.load(Ordering::Relaxed) / sent } else { 0 };

    println!("\n=== Results ===");
    println!("Duration:    {:.2}s", elapsed.as_secs_f64());
    println!("Total sent:  {}", sent);
    println!("Allowed:     {}", counters.allowed.load(Ordering::Relaxed));
    println!("Challenged:  {}", counters.challenged.load(Ordering::Relaxed));
    println!("Throttled:   {}", counters.throttled.load(Ordering::Relaxed));
    println!("Blocked:     {}", counters.blocked.load(Ordering::Relaxed));
    println!("Masked:      {}", counters.masked.load(Ordering::Relaxed));
    println!("Net errors:  {}", counters.network_error.load(Ordering::Relaxed));
    println!("Avg latency: {} us", avg_lat);
    println!("Throughput:  {:.1} req/s", sent as f64 / elapsed.as_secs_f64());
}
