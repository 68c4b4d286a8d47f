//! Minimal stand-in for the Python analysis backend.
//!
//! Accepts the same invocation contract as the real backend
//! (`<interpreter> -u <entrypoint> --host 127.0.0.1 --port N`) and serves
//! the `/health` endpoint. Used by the integration tests and handy for
//! exercising the launcher locally without a Python toolchain.
//!
//! The entrypoint file doubles as a tiny behavior script: `silent` in its
//! contents makes the stub bind nothing and sleep forever (a backend that
//! starts but never becomes healthy), `crash` makes it exit immediately
//! with a non-zero code.

use std::net::Ipv4Addr;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use axum::routing::get;
use axum::Router;

struct Invocation {
    entrypoint: PathBuf,
    host: Ipv4Addr,
    port: u16,
}

fn parse_args() -> Result<Invocation> {
    let mut entrypoint = None;
    let mut host = Ipv4Addr::LOCALHOST;
    let mut port = 8000u16;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-u" => {}
            "--host" => {
                let value = args.next().context("--host needs a value")?;
                host = value.parse().context("invalid --host value")?;
            }
            "--port" => {
                let value = args.next().context("--port needs a value")?;
                port = value.parse().context("invalid --port value")?;
            }
            other if entrypoint.is_none() => entrypoint = Some(PathBuf::from(other)),
            other => bail!("unexpected argument {other}"),
        }
    }

    Ok(Invocation {
        entrypoint: entrypoint.context("missing entrypoint argument")?,
        host,
        port,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let invocation = parse_args()?;

    let script = std::fs::read_to_string(&invocation.entrypoint).with_context(|| {
        format!(
            "failed to read entrypoint {}",
            invocation.entrypoint.display()
        )
    })?;

    if script.contains("crash") {
        eprintln!("backend stub crashing on request");
        std::process::exit(7);
    }

    if script.contains("silent") {
        eprintln!("backend stub running silent: not binding a port");
        loop {
            tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
        }
    }

    let listener = tokio::net::TcpListener::bind((invocation.host, invocation.port))
        .await
        .with_context(|| format!("failed to bind {}:{}", invocation.host, invocation.port))?;
    let addr = listener.local_addr()?;

    // Leave a record of the bound port in the working directory so callers
    // can observe which port the launcher actually handed us
    std::fs::write("port.txt", addr.port().to_string()).context("failed to write port.txt")?;

    println!(
        "backend stub listening on {} (CLIENT_ORIGIN={})",
        addr,
        std::env::var("CLIENT_ORIGIN").unwrap_or_default()
    );

    let app = Router::new().route("/health", get(|| async { "{\"ok\":true}" }));
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
