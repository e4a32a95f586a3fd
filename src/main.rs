use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use tablebook::config::Config;
use tablebook::crypto::{CUSTOMER_DATA_KEY, Encryptor, LocalKeyring};
use tablebook::engine::VenueServices;
use tablebook::venue::VenueManager;
use tablebook::{mailer, observability, tls, wire};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    observability::init_tracing();

    let config = Config::from_env()?;
    observability::init_metrics(config.metrics_port)?;

    let tls_acceptor =
        tls::load_tls_acceptor(config.tls_cert.as_deref(), config.tls_key.as_deref())?;

    let encryptor: Arc<dyn Encryptor> = match &config.encryption_key {
        Some(key) => Arc::new(LocalKeyring::new().with_base64_key(CUSTOMER_DATA_KEY, key)?),
        None => {
            warn!("TABLEBOOK_ENCRYPTION_KEY not set; customer data will be unreadable after restart");
            Arc::new(LocalKeyring::new().with_ephemeral_key(CUSTOMER_DATA_KEY))
        }
    };
    let notifier = mailer::build_notifier(&config.mail_transport, &config.mail_from)?;
    let services = VenueServices {
        encryptor,
        notifier,
        pics_dir: config.pics_dir.clone(),
    };

    std::fs::create_dir_all(&config.data_dir)?;

    let venues = Arc::new(
        VenueManager::new(
            config.data_dir.clone(),
            config.compact_threshold,
            config.reserve.clone(),
            services,
        )
        .with_refresh_interval(config.refresh_interval)
        .with_seed_dir(config.seed_dir.clone()),
    );
    let clients = Arc::new(config.clients.clone());
    let max_connections = config.max_connections;
    let semaphore = Arc::new(Semaphore::new(max_connections));

    let addr = config.listen_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!("tablebook listening on {addr}");
    info!("  data_dir: {}", config.data_dir.display());
    info!("  max_connections: {max_connections}");
    info!("  capacity: {}", config.reserve.policy.threshold);
    info!("  clients: {}", clients.len());
    info!("  tls: {}", if tls_acceptor.is_some() { "enabled" } else { "disabled" });

    // Stop accepting on SIGTERM/ctrl-c, then drain in-flight connections
    #[cfg(unix)]
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
    let shutdown = async {
        #[cfg(unix)]
        {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = sigterm.recv() => {}
            }
        }
        #[cfg(not(unix))]
        {
            tokio::signal::ctrl_c().await.ok();
        }
    };
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = listener.accept() => {
                let (socket, peer) = match result {
                    Ok(conn) => conn,
                    Err(e) => {
                        tracing::error!("accept error: {e}");
                        continue;
                    }
                };

                let permit = match semaphore.clone().try_acquire_owned() {
                    Ok(permit) => permit,
                    Err(_) => {
                        warn!("connection limit reached, rejecting {peer}");
                        metrics::counter!(observability::CONNECTIONS_REJECTED_TOTAL).increment(1);
                        drop(socket);
                        continue;
                    }
                };

                info!("connection from {peer}");
                metrics::counter!(observability::CONNECTIONS_TOTAL).increment(1);
                metrics::gauge!(observability::CONNECTIONS_ACTIVE).increment(1.0);
                let venues = venues.clone();
                let clients = clients.clone();
                let pw = config.password.clone();
                let tls = tls_acceptor.clone();

                tokio::spawn(async move {
                    let _permit = permit;
                    if let Err(e) = wire::process_connection(socket, venues, clients, pw, tls).await {
                        tracing::error!("connection error from {peer}: {e}");
                    }
                    metrics::gauge!(observability::CONNECTIONS_ACTIVE).decrement(1.0);
                });
            }
            _ = &mut shutdown => {
                info!("shutdown signal received, stopping accept loop");
                break;
            }
        }
    }

    info!("draining connections...");
    let drain_deadline = tokio::time::sleep(Duration::from_secs(10));
    tokio::pin!(drain_deadline);

    loop {
        if semaphore.available_permits() == max_connections {
            info!("all connections drained");
            break;
        }
        tokio::select! {
            _ = &mut drain_deadline => {
                let remaining = max_connections - semaphore.available_permits();
                warn!("drain timeout, {remaining} connections still open");
                break;
            }
            _ = tokio::time::sleep(Duration::from_millis(100)) => {}
        }
    }

    info!("tablebook stopped");
    Ok(())
}
