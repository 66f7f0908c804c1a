//! Print the product id and line status of an AOTF controller.
//!
//! Set RUST_LOG=debug to see every byte on the wire.

use std::path::PathBuf;

use aaopto_aotf_lib::{Aotf, AotfResult, DeviceConfig, SimulatedAotf};
use clap::builder::BoolishValueParser;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "aotf-status")]
#[command(about = "Print the product id and line status of an AOTF controller")]
#[command(version)]
struct Args {
    /// JSON device configuration to load
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Serial port, overriding the one in the configuration
    #[arg(short, long, value_name = "NAME")]
    port: Option<String>,

    /// Talk to the built-in simulator instead of hardware
    #[arg(long, env = "AOTF_SIMULATE", value_parser = BoolishValueParser::new())]
    simulate: bool,
}

impl Args {
    fn device_config(&self) -> AotfResult<DeviceConfig> {
        let mut config = match &self.config {
            Some(path) => DeviceConfig::load(path)?,
            None => DeviceConfig::default(),
        };
        if let Some(port) = &self.port {
            config.port = Some(port.clone());
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();
    let config = args.device_config()?;

    let mut aotf = if args.simulate {
        Aotf::open_with::<SimulatedAotf>(&config)?
    } else {
        Aotf::open(&config)?
    };

    println!("Product id: {}", aotf.get_product_id()?);
    let status = aotf.get_lines_status()?;
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use aaopto_aotf_lib::AotfError;
    use clap::error::ErrorKind;

    #[test]
    fn parses_config_and_port() {
        let args = Args::try_parse_from([
            "aotf-status",
            "--config",
            "lab.cfg",
            "--port",
            "/dev/ttyUSB0",
            "--simulate",
        ])
        .unwrap();
        assert_eq!(args.config, Some(PathBuf::from("lab.cfg")));
        assert_eq!(args.port.as_deref(), Some("/dev/ttyUSB0"));
        assert!(args.simulate);
    }

    #[test]
    fn bare_argument_is_a_usage_error() {
        let err = Args::try_parse_from(["aotf-status", "lab.cfg"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownArgument);
    }

    #[test]
    fn help_is_not_a_port_name() {
        let err = Args::try_parse_from(["aotf-status", "--help"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
    }

    #[test]
    fn config_file_is_loaded_whatever_its_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lab.cfg");
        std::fs::write(&path, r#"{ "baud_rate": 57600 }"#).unwrap();
        let args = Args {
            config: Some(path),
            port: Some("/dev/ttyUSB1".into()),
            simulate: true,
        };
        let config = args.device_config().unwrap();
        assert_eq!(config.baud_rate, 57600);
        assert_eq!(config.port.as_deref(), Some("/dev/ttyUSB1"));
    }

    #[test]
    fn invalid_config_is_rejected_when_simulating() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lab.cfg");
        std::fs::write(&path, r#"{ "baud_rate": 300 }"#).unwrap();
        let args = Args {
            config: Some(path),
            port: None,
            simulate: true,
        };
        assert!(matches!(args.device_config(), Err(AotfError::Config(_))));
    }
}
