use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("faderlink {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: faderlink");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("FADERLINK_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!(
        "profile: {}",
        option_env!("FADERLINK_BUILD_PROFILE").unwrap_or("unknown")
    );
    println!(
        "defaults: local_port={}, monitor_port={}, resolution={} (max {})",
        faderlink_mixer::DEFAULT_LOCAL_PORT,
        faderlink_mixer::DEFAULT_MONITOR_PORT,
        faderlink_mixer::DEFAULT_RESOLUTION,
        faderlink_mixer::MAX_RESOLUTION
    );

    Ok(SUCCESS)
}
