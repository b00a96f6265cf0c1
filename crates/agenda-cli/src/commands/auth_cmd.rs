use agenda_core::CredentialProvider;

use crate::cli::AuthCommands;
use crate::config_profiles::CliProfilesConfig;
use crate::credentials::{profile_credentials, stored_credentials, TOKEN_ENV_VAR};
use crate::error::CliError;

pub fn run_auth(command: AuthCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    let config = CliProfilesConfig::load().map_err(CliError::Config)?;
    match command {
        AuthCommands::Login { profile, token } => {
            let profile_name = config.resolve_profile_name(profile.as_deref().or(global_profile));
            stored_credentials(&profile_name)
                .sign_in(&token)
                .map_err(|error| CliError::Auth(error.to_string()))?;
            println!("Stored API token for profile '{profile_name}'");
            if config.profile(&profile_name).and_then(|profile| profile.api_base_url()).is_none() {
                println!(
                    "Profile '{profile_name}' has no API base URL yet. Run `agenda config init --api-base-url <url>`."
                );
            }
            Ok(())
        }
        AuthCommands::Status { profile } => {
            let profile_name = config.resolve_profile_name(profile.as_deref().or(global_profile));
            let stored = stored_credentials(&profile_name)
                .stored_token()
                .map_err(|error| CliError::Auth(error.to_string()))?;
            let effective = profile_credentials(&profile_name).current_token();

            match (effective, stored) {
                (Some(_), None) => println!(
                    "Profile '{profile_name}' is signed in via {TOKEN_ENV_VAR}"
                ),
                (Some(_), Some(_)) => println!("Profile '{profile_name}' is signed in"),
                (None, _) => println!(
                    "Profile '{profile_name}' is not signed in; changes stay on this device."
                ),
            }
            Ok(())
        }
        AuthCommands::Logout { profile } => {
            let profile_name = config.resolve_profile_name(profile.as_deref().or(global_profile));
            stored_credentials(&profile_name)
                .sign_out()
                .map_err(|error| CliError::Auth(error.to_string()))?;
            println!("Signed out profile '{profile_name}'");
            Ok(())
        }
    }
}
