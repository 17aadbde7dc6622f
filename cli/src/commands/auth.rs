use anyhow::{Result, bail};
use serde::Serialize;

use platewise_core::service::Tracker;

use crate::config::Config;

use super::helpers::print_json;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Session<'a> {
    user_email: Option<&'a str>,
}

pub(crate) fn cmd_login(tracker: &Tracker, config: &Config, email: &str, json: bool) -> Result<()> {
    if config.allow_list.is_empty() {
        bail!(
            "No emails are allowed yet. Set PLATEWISE_ALLOWED_EMAILS or list them in {}",
            config.allowed_emails_path().display()
        );
    }
    let user = tracker.login(email)?;
    if json {
        print_json(&Session {
            user_email: Some(user.as_str()),
        })?;
    } else {
        println!("Logged in as {user}");
    }
    Ok(())
}

pub(crate) fn cmd_logout(tracker: &Tracker, json: bool) -> Result<()> {
    let was_logged_in = tracker.logout()?;
    if json {
        print_json(&Session { user_email: None })?;
    } else if was_logged_in {
        println!("Logged out");
    } else {
        println!("Not logged in");
    }
    Ok(())
}

pub(crate) fn cmd_whoami(tracker: &Tracker, json: bool) -> Result<()> {
    let user = tracker.current_user()?;
    if json {
        print_json(&Session {
            user_email: user.as_ref().map(|u| u.as_str()),
        })?;
    } else {
        match user {
            Some(u) => println!("{u}"),
            None => println!("Not logged in"),
        }
    }
    Ok(())
}
