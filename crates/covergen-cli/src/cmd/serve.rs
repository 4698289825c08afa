use anyhow::Result;
use std::path::Path;

/// Start the HTTP API and block until Ctrl-C.
pub fn run(root: &Path, port: Option<u16>, open_browser: bool) -> Result<()> {
    let (config, _) = super::open(root)?;
    let port = port.unwrap_or(config.server.port);

    let rt = tokio::runtime::Runtime::new()?;
    let root_buf = root.to_path_buf();

    rt.block_on(async move {
        let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
        let actual_port = listener.local_addr()?.port();
        let pid = std::process::id();
        println!("covergen API → http://localhost:{actual_port}/api  (PID {pid})");

        tokio::select! {
            res = covergen_server::serve_on(root_buf, listener, open_browser) => res,
            _ = tokio::signal::ctrl_c() => Ok(()),
        }
    })
}
