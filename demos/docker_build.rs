use cmdkit::prelude::*;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = ArgConfig::from_json_str(
        r#"{
            "docker": null,
            "build": null,
            "tag": ["ci/app:1.0", "ci/app:latest"],
            "build_arg": {"RUBY_VERSION": "3.3", "JOBS": 4},
            "pull": true,
            "no_cache": false,
            "file": "Dockerfile",
            ".": null
        }"#,
    )?;
    let tokens = build(&cfg, FlagStyle::gnu());
    println!("{}", cmdkit::render::command_line(&tokens));

    // `echo` stands in for docker so the demo runs anywhere
    let mut dry = vec!["echo".to_string()];
    dry.extend(tokens);
    let task = async_run(&dry, None, RunOptions::new())?;
    let (out, status) = task.wait()?;
    print!("{}", out);
    if !status.success() {
        std::process::exit(status.code().unwrap_or(1));
    }
    Ok(())
}
