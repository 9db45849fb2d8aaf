use std::path::PathBuf;

use serde::Serialize;
use waiter_core::config::AppConfig;
use waiter_core::menu::Catalog;

use crate::commands::load_config;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(config_path: Option<PathBuf>, json_output: bool) -> (bool, String) {
    let report = build_report(config_path);
    let passed = report.overall_status == CheckStatus::Pass;

    if json_output {
        let output = serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
        return (passed, output);
    }

    (passed, render_human(&report))
}

fn build_report(config_path: Option<PathBuf>) -> DoctorReport {
    let mut checks = Vec::new();

    match load_config(config_path) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_bot_token(&config));
            checks.push(check_menu_catalog(&config));
            checks.push(check_llm_endpoint(&config));
            checks.push(check_speech(&config));
            checks.push(check_speech_synthesis(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in [
                "telegram_token_readiness",
                "menu_catalog",
                "llm_endpoint",
                "speech",
                "speech_synthesis",
            ] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    // a skipped optional feature is not a failure
    let all_pass = checks.iter().all(|check| check.status != CheckStatus::Fail);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_bot_token(config: &AppConfig) -> DoctorCheck {
    match config.validate_transport() {
        Ok(()) => DoctorCheck {
            name: "telegram_token_readiness",
            status: CheckStatus::Pass,
            details: format!("bot token present; api at {}", config.telegram.api_base_url),
        },
        Err(error) => DoctorCheck {
            name: "telegram_token_readiness",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    }
}

fn check_menu_catalog(config: &AppConfig) -> DoctorCheck {
    match Catalog::try_load(&config.menu.path) {
        Ok(catalog) if catalog.is_empty() => DoctorCheck {
            name: "menu_catalog",
            status: CheckStatus::Fail,
            details: format!("`{}` contains no products", config.menu.path.display()),
        },
        Ok(catalog) => DoctorCheck {
            name: "menu_catalog",
            status: CheckStatus::Pass,
            details: format!(
                "loaded {} products from `{}`",
                catalog.len(),
                config.menu.path.display()
            ),
        },
        Err(error) => {
            DoctorCheck { name: "menu_catalog", status: CheckStatus::Fail, details: error.to_string() }
        }
    }
}

fn check_llm_endpoint(config: &AppConfig) -> DoctorCheck {
    DoctorCheck {
        name: "llm_endpoint",
        status: CheckStatus::Pass,
        details: format!(
            "{:?} model `{}` at {}",
            config.llm.provider,
            config.llm.model,
            config.llm.effective_base_url()
        ),
    }
}

fn check_speech(config: &AppConfig) -> DoctorCheck {
    match &config.speech.command {
        Some(command) => DoctorCheck {
            name: "speech",
            status: CheckStatus::Pass,
            details: format!("voice messages transcribed by `{command}`"),
        },
        None => DoctorCheck {
            name: "speech",
            status: CheckStatus::Skipped,
            details: "speech.command is unset; voice messages will be declined".to_string(),
        },
    }
}

fn check_speech_synthesis(config: &AppConfig) -> DoctorCheck {
    match &config.speech.synthesis_command {
        Some(command) => DoctorCheck {
            name: "speech_synthesis",
            status: CheckStatus::Pass,
            details: format!("voice turns answered with audio from `{command}`"),
        },
        None => DoctorCheck {
            name: "speech_synthesis",
            status: CheckStatus::Skipped,
            details: "speech.synthesis_command is unset; voice turns get text replies".to_string(),
        },
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
