//! `update-settings`: change computation settings of an analyzed application.
use super::{failure, CommandContext};
use crate::cli::UpdateSettingsArgs;
use crate::exit::ExitStatus;
use crate::jobs::CancelToken;
use regex::Regex;
use tracing::{error, info};

/// Settings the console accepts, with their allowed values.
const VALID_SETTINGS: &[(&str, &[&str])] = &[
    ("FILTER_LOOKUP_TABLES", &["true", "false"]),
    ("DEFAULT_DATA_FUNCTION_TYPE", &["EIF", "ILF"]),
    ("DEFAULT_TRANSACTION_TYPE", &["EI", "EO", "EQ"]),
];

pub(crate) fn run(args: UpdateSettingsArgs, cancel: CancelToken) -> ExitStatus {
    let pairs = match parse_settings(&args.new_settings) {
        Ok(pairs) => pairs,
        Err(message) => {
            error!("{message}");
            info!(
                "use the format: update-settings --new-settings \
                 \"FILTER_LOOKUP_TABLES=true,DEFAULT_DATA_FUNCTION_TYPE=EIF\""
            );
            return ExitStatus::InvalidParameters;
        }
    };

    let ctx = match CommandContext::connect(&args.shared, cancel) {
        Ok(ctx) => ctx,
        Err(status) => return status,
    };
    match execute(&ctx, &args, &pairs) {
        Ok(status) => status,
        Err(err) => failure(err),
    }
}

fn execute(
    ctx: &CommandContext,
    args: &UpdateSettingsArgs,
    pairs: &[(String, String)],
) -> anyhow::Result<ExitStatus> {
    let apps = ctx.apps();

    let Some(app) = apps.application_by_name(&args.app_name)? else {
        error!("application '{}' was not found on the console", args.app_name);
        return Ok(ExitStatus::ApplicationNotFound);
    };
    let details = apps.application_details(&app.guid)?;
    if !details.managed {
        error!(
            "settings are not available for '{}': the application has not been \
             analyzed or the analysis is still running",
            args.app_name
        );
        return Ok(ExitStatus::GeneralError);
    }

    for (key, value) in pairs {
        apps.update_computation_setting(&app.guid, key, value)?;
        info!("updated {key} to {value}");
    }
    info!("settings updated successfully");
    Ok(ExitStatus::Success)
}

/// Parse and validate `key=value,key=value` input against the whitelist.
fn parse_settings(raw: &str) -> Result<Vec<(String, String)>, String> {
    let pair = r"[A-Za-z_][A-Za-z0-9_]*=[A-Za-z0-9 ]+";
    let shape = Regex::new(&format!("^({pair})(,{pair})*$")).map_err(|err| err.to_string())?;
    if raw.is_empty() || !shape.is_match(raw) {
        return Err("invalid value given for --new-settings".to_string());
    }

    let mut pairs = Vec::new();
    for entry in raw.split(',') {
        let Some((key, value)) = entry.split_once('=') else {
            return Err("invalid value given for --new-settings".to_string());
        };
        let Some((_, allowed)) = VALID_SETTINGS.iter().find(|(name, _)| *name == key) else {
            let known: Vec<&str> = VALID_SETTINGS.iter().map(|(name, _)| *name).collect();
            return Err(format!(
                "no setting available with name {key}; valid keys are [ {} ]",
                known.join(", ")
            ));
        };
        if !allowed.contains(&value) {
            return Err(format!(
                "invalid value {value:?} for {key}; valid values are [ {} ]",
                allowed.join(", ")
            ));
        }
        pairs.push((key.to_string(), value.to_string()));
    }
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::parse_settings;

    #[test]
    fn accepts_known_keys_and_values() {
        let pairs =
            parse_settings("FILTER_LOOKUP_TABLES=true,DEFAULT_DATA_FUNCTION_TYPE=EIF").unwrap();
        assert_eq!(
            pairs,
            [
                ("FILTER_LOOKUP_TABLES".to_string(), "true".to_string()),
                ("DEFAULT_DATA_FUNCTION_TYPE".to_string(), "EIF".to_string()),
            ]
        );
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(parse_settings("").is_err());
        assert!(parse_settings("FILTER_LOOKUP_TABLES").is_err());
        assert!(parse_settings("=true").is_err());
        assert!(parse_settings("A=1,,B=2").is_err());
    }

    #[test]
    fn rejects_unknown_keys_and_values() {
        let err = parse_settings("NOT_A_SETTING=true").unwrap_err();
        assert!(err.contains("NOT_A_SETTING"));
        let err = parse_settings("FILTER_LOOKUP_TABLES=maybe").unwrap_err();
        assert!(err.contains("FILTER_LOOKUP_TABLES"));
    }
}
