//! `XLFILL_*` environment variables
//!
//! Kept in its own test binary: the variables are process-wide.

use clap::Parser;
use pretty_assertions::assert_eq;
use xlfill::cli::ServerArgs;
use xlfill::Settings;

#[derive(Parser)]
struct Server {
    #[command(flatten)]
    args: ServerArgs,
}

#[test]
fn test_environment_variables_feed_server_flags() {
    std::env::set_var("XLFILL_APP_NAME", "reports");
    std::env::set_var("XLFILL_PORT", "9100");
    std::env::set_var("XLFILL_DEBUG", "yes");
    std::env::set_var("XLFILL_CORS_ORIGINS", "http://a.test, http://b.test");
    std::env::set_var("XLFILL_MAX_BODY_BYTES", "1024");

    let from_env = Server::try_parse_from(["xlfill-server"]).unwrap().args;
    let mut settings = Settings::default();
    from_env.apply(&mut settings);
    assert_eq!(settings.app_name, "reports");
    assert_eq!(settings.port, 9100);
    assert!(settings.debug);
    assert_eq!(settings.cors_origins, vec!["http://a.test", "http://b.test"]);
    assert_eq!(settings.max_body_bytes, 1024);

    // A flag wins over its variable
    let flagged = Server::try_parse_from(["xlfill-server", "--port", "9200", "--debug=false"])
        .unwrap()
        .args;
    flagged.apply(&mut settings);
    assert_eq!(settings.port, 9200);
    assert!(!settings.debug);

    std::env::set_var("XLFILL_PORT", "eighty");
    assert!(Server::try_parse_from(["xlfill-server"]).is_err());
}
