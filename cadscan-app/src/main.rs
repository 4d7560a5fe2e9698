use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use cadscan_config::{AppConfig, OutputFormat};
use cadscan_io::{DecodeOptions, DxfDecoder};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

mod report;

/// 读取 ASCII DXF 文件并列出模型空间中的线段、圆、圆弧、多段线与文字。
#[derive(Debug, Parser)]
#[command(name = "cadscan", version)]
struct Cli {
    /// 待解码的 DXF 文件
    file: PathBuf,
    /// 以 JSON 输出 `{ header, result, diagnostics }`
    #[arg(long)]
    json: bool,
    /// 缩进 JSON 输出
    #[arg(long, conflicts_with = "compact")]
    pretty: bool,
    /// 单行 JSON 输出，覆盖配置中的 `pretty = true`
    #[arg(long)]
    compact: bool,
    /// 配置文件路径，缺省时按 `CADSCAN_CONFIG` 与 `./config/default.toml` 查找
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// 覆盖配置中的日志等级
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,
    /// 同时提取图纸空间实体
    #[arg(long)]
    include_paper_space: bool,
    /// 不报告不支持的实体类型
    #[arg(long)]
    quiet_unsupported: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "cadscan 执行失败");
            eprintln!("错误：{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = load_configuration(cli.config.as_deref())?;
    init_logging(cli.log_level.as_deref().unwrap_or(&config.logging.level));
    info!(file = %cli.file.display(), "启动 cadscan");

    let decoder = DxfDecoder::with_options(decode_options(cli, &config));
    let decoded = decoder.decode_file(&cli.file)?;
    if decoded.has_diagnostics() {
        warn!(count = decoded.diagnostics.len(), "部分实体未能解码");
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if cli.json || config.output.format == OutputFormat::Json {
        report::write_json(&mut out, &decoded, json_pretty(cli, &config))?;
    } else {
        report::write_summary(&mut out, &cli.file, &decoded)?;
    }
    out.flush()?;
    Ok(())
}

fn load_configuration(override_path: Option<&Path>) -> anyhow::Result<AppConfig> {
    match override_path {
        Some(path) => AppConfig::from_file(path)
            .with_context(|| format!("加载指定配置 {} 失败", path.display())),
        None => AppConfig::discover().context("加载默认配置失败"),
    }
}

/// 命令行开关只能打开对应行为，不会关闭配置中已打开的选项。
fn decode_options(cli: &Cli, config: &AppConfig) -> DecodeOptions {
    DecodeOptions {
        report_unsupported: config.decoder.report_unsupported && !cli.quiet_unsupported,
        include_paper_space: config.decoder.include_paper_space || cli.include_paper_space,
        fallback_encoding: config.decoder.fallback_code_page.clone(),
    }
}

fn json_pretty(cli: &Cli, config: &AppConfig) -> bool {
    if cli.compact {
        false
    } else {
        cli.pretty || config.output.pretty
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(filter).with_writer(io::stderr);
    if subscriber.try_init().is_err() {
        // 已初始化，忽略
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_decoder_config() {
        let cli = Cli::parse_from(["cadscan", "a.dxf", "--include-paper-space", "--quiet-unsupported"]);
        let options = decode_options(&cli, &AppConfig::default());
        assert!(options.include_paper_space);
        assert!(!options.report_unsupported);
        assert!(options.fallback_encoding.is_none());
    }

    #[test]
    fn config_values_pass_through_without_flags() {
        let cli = Cli::parse_from(["cadscan", "a.dxf"]);
        let config = AppConfig::from_toml_str(
            "[decoder]\nreport_unsupported = false\nfallback_code_page = \"ANSI_936\"\n",
        )
        .expect("config");
        let options = decode_options(&cli, &config);
        assert!(!options.report_unsupported);
        assert!(!options.include_paper_space);
        assert_eq!(options.fallback_encoding.as_deref(), Some("ANSI_936"));
    }

    #[test]
    fn compact_flag_overrides_pretty_config() {
        let config = AppConfig::default();
        assert!(config.output.pretty);

        let compact = Cli::parse_from(["cadscan", "a.dxf", "--json", "--compact"]);
        assert!(!json_pretty(&compact, &config));

        let plain = Cli::parse_from(["cadscan", "a.dxf", "--json"]);
        assert!(json_pretty(&plain, &config));

        let quiet_config = AppConfig::from_toml_str("[output]\npretty = false\n").expect("config");
        let pretty = Cli::parse_from(["cadscan", "a.dxf", "--pretty"]);
        assert!(json_pretty(&pretty, &quiet_config));
        assert!(!json_pretty(&plain, &quiet_config));
    }

    #[test]
    fn pretty_and_compact_conflict() {
        assert!(Cli::try_parse_from(["cadscan", "a.dxf", "--pretty", "--compact"]).is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
