use drawkit_core::{PageLocation, StreamConfig, build_stream_url, resolve_stream_origin};

pub fn run(path: &str, page: &str, ws_base: Option<&str>) {
    let location = PageLocation::parse(page)
        .unwrap_or_else(|e| super::fail(format!("invalid --page '{page}': {e}")));

    let config = match ws_base {
        Some(origin) => StreamConfig::new(location).with_override(origin),
        None => StreamConfig::from_env(location),
    };

    log::info!("stream origin {}", resolve_stream_origin(&config));
    println!("{}", build_stream_url(&config, path));
}
