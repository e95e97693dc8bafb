fn main() {
    #[cfg(not(target_arch = "wasm32"))]
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = app_core::DemoConfig::from_args(std::env::args());
    if let Err(error) = app_core::run(config) {
        log::error!("Failed to resolve frame graph: {error}");
        std::process::exit(1);
    }
}
