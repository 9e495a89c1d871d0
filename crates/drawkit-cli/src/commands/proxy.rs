use drawkit_server::{API_PREFIX, ProxyConfig};

pub fn run(host: &str, port: u16, target: Option<&str>, allow_hosts: &[String]) {
    let config = match target {
        Some(t) => ProxyConfig::new(t),
        None => ProxyConfig::from_env(),
    };
    let mut config =
        config.unwrap_or_else(|e| super::fail(format!("invalid backend target: {e}")));
    for h in allow_hosts {
        config = config.allow_host(h.clone());
    }

    let base = format!("http://{host}:{port}");

    println!("🎲 drawkit dev server v{}", drawkit_core::VERSION);
    println!("   {base}");
    println!("   {API_PREFIX}/* -> {}", config.target);
    println!("   allowed hosts: {}", config.allowed_hosts.join(", "));
    println!();
    println!("   Pages:");
    println!("     GET /            redirects to /draw");
    println!("     GET /draw        Draw");
    println!("     GET /verify      Verify");
    println!("     GET /passport    Passport");
    println!("     GET /__drawkit   server info and route table");
    println!();
    println!("   Examples:");
    println!("     curl {base}{API_PREFIX}/draw/<job_id>");
    println!("     curl -N {base}{API_PREFIX}/draw/<job_id>/events");
    println!();

    let rt = super::runtime();
    if let Err(e) = rt.block_on(drawkit_server::run_server(config, host, port)) {
        super::fail(format!("server stopped: {e}"));
    }
}
