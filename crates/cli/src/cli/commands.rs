use clap::{
    Arg, ArgAction, ColorChoice, Command,
    builder::styling::{AnsiColor, Effects, Styles},
};

pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new("fieldline")
        .about("Field-service API session and permission tool")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("api-url")
                .long("api-url")
                .help("Base URL of the field-service API, example: https://api.fieldline.tld")
                .env("FIELDLINE_API_URL")
                .global(true),
        )
        .arg(
            Arg::new("credentials-file")
                .long("credentials-file")
                .help("Where the session is kept between invocations")
                .env("FIELDLINE_CREDENTIALS_FILE")
                .value_parser(clap::value_parser!(std::path::PathBuf))
                .global(true),
        )
        .arg(
            Arg::new("verbosity")
                .short('v')
                .long("verbose")
                .help("Increase log verbosity, -vv for debug")
                .action(ArgAction::Count)
                .global(true),
        )
        .subcommand(login())
        .subcommand(Command::new("logout").about("End the session and forget stored credentials"))
        .subcommand(request())
        .subcommand(can())
        .subcommand(Command::new("roles").about("Print the role hierarchy and its grants"))
}

fn login() -> Command {
    Command::new("login")
        .about("Sign in and store the session")
        .arg(
            Arg::new("identifier")
                .short('i')
                .long("identifier")
                .help("Account identifier (usually the e-mail address)")
                .env("FIELDLINE_IDENTIFIER")
                .required(true),
        )
        .arg(
            Arg::new("secret")
                .long("secret")
                .help("Account secret")
                .env("FIELDLINE_SECRET")
                .hide_env_values(true)
                .required(true),
        )
}

fn request() -> Command {
    Command::new("request")
        .about("Send an authenticated request and print the response")
        .arg(
            Arg::new("method")
                .help("HTTP method, example: GET")
                .required(true),
        )
        .arg(
            Arg::new("path")
                .help("Path relative to the API URL, example: /contacts")
                .required(true),
        )
        .arg(
            Arg::new("data")
                .short('d')
                .long("data")
                .help("JSON request body"),
        )
}

fn can() -> Command {
    Command::new("can")
        .about("Explain whether a role holds one or more permissions")
        .arg(
            Arg::new("role")
                .help("Role name, example: manager")
                .required(true),
        )
        .arg(
            Arg::new("permissions")
                .help("Permissions in resource:action form, example: invoices:read")
                .required(true)
                .num_args(1..),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let command = new();

        assert_eq!(command.get_name(), "fieldline");
        assert_eq!(
            command.get_version().map(ToString::to_string),
            Some(env!("CARGO_PKG_VERSION").to_string())
        );
        command.debug_assert();
    }

    #[test]
    fn test_login_args() {
        temp_env::with_vars(
            [
                ("FIELDLINE_SECRET", None::<&str>),
                ("FIELDLINE_IDENTIFIER", None::<&str>),
            ],
            || {
                let matches = new().get_matches_from(vec![
                    "fieldline",
                    "--api-url",
                    "https://api.fieldline.test",
                    "login",
                    "--identifier",
                    "tech@acme.test",
                    "--secret",
                    "hunter2",
                ]);

                assert_eq!(
                    matches.get_one::<String>("api-url").map(String::as_str),
                    Some("https://api.fieldline.test")
                );
                let (name, sub) = matches.subcommand().unwrap();
                assert_eq!(name, "login");
                assert_eq!(
                    sub.get_one::<String>("identifier").map(String::as_str),
                    Some("tech@acme.test")
                );
            },
        );
    }

    #[test]
    fn test_secret_from_env() {
        temp_env::with_vars(
            [
                ("FIELDLINE_SECRET", Some("from-env")),
                ("FIELDLINE_IDENTIFIER", Some("ops@acme.test")),
            ],
            || {
                let matches = new().get_matches_from(vec!["fieldline", "login"]);
                let sub = matches.subcommand_matches("login").unwrap();
                assert_eq!(
                    sub.get_one::<String>("secret").map(String::as_str),
                    Some("from-env")
                );
            },
        );
    }

    #[test]
    fn test_can_requires_a_permission() {
        let result = new().try_get_matches_from(vec!["fieldline", "can", "manager"]);
        assert!(result.is_err());

        let matches = new()
            .try_get_matches_from(vec!["fieldline", "can", "manager", "jobs:read", "invoices:delete"])
            .unwrap();
        let sub = matches.subcommand_matches("can").unwrap();
        let permissions: Vec<&String> = sub.get_many::<String>("permissions").unwrap().collect();
        assert_eq!(permissions.len(), 2);
    }

    #[test]
    fn test_global_args_after_subcommand() {
        let matches = new()
            .try_get_matches_from(vec!["fieldline", "roles", "-vv", "--credentials-file", "/tmp/c.json"])
            .unwrap();
        assert_eq!(matches.get_count("verbosity"), 2);
        assert!(matches.get_one::<std::path::PathBuf>("credentials-file").is_some());
    }
}
