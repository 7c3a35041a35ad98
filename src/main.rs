use std::sync::Arc;
use log::error;

use allm_proxy::{server, ProxyBackend, ProxyConfig};

#[tokio::main]
async fn main()
{   env_logger::Builder::from_env(
      env_logger::Env::default().default_filter_or("info")
    ).init();

    if let Err(e) = run().await
    {   error!("allm-proxy stopped: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), allm_proxy::Error>
{   let config = ProxyConfig::load()?;
    let backend = Arc::new(ProxyBackend::new(config)?);
    server::serve(backend).await
}
