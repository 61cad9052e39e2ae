/// Parse a `FILENAME=TITLE` pair given on the command line.
pub fn parse_title_assignment(s: &str) -> Result<(String, String), String> {
    let (filename, title) = s
        .split_once('=')
        .ok_or_else(|| format!("expected FILENAME=TITLE, got '{}'", s))?;
    let filename = filename.trim();
    if filename.is_empty() {
        return Err(format!("missing filename in '{}'", s));
    }
    Ok((filename.to_string(), title.trim().to_string()))
}


/// Initialize tracing for CLI binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}
