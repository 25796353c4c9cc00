//! This crate houses functions common for bots in this workspace, because some things
//! are just boilerplate and aaAAAAAAAAA

use std::future::Future;

use teloxide::types::User;

/// Initialize logging and start the `closure` in an async runtime.
/// Logging is enabled by default on level `info` unless overridden
/// by environment variable `RUST_LOG`. This uses the crate
/// [pretty_env_logger][] internally, see its documentation for more details.
///
/// # Panics
///
/// Panics if the async runtime could not be built.
///
/// [pretty_env_logger]: https://docs.rs/pretty_env_logger
pub fn start_everything(closure: impl Future<Output = ()>) {
    let log_level = std::env::var_os("RUST_LOG")
        .unwrap_or_else(|| std::ffi::OsString::from("info"))
        .into_string()
        .unwrap_or_else(|_| String::from("info"));

    // journald timestamps everything by itself.
    let running_as_systemd_service = std::env::var_os("JOURNAL_STREAM").is_some();

    let mut builder = match running_as_systemd_service {
        true => pretty_env_logger::formatted_builder(),
        false => pretty_env_logger::formatted_timed_builder(),
    };

    builder.parse_filters(&log_level);

    if builder.try_init().is_err() {
        log::error!("Tried to init logger twice!");
    }

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to build the async runtime!")
        .block_on(closure);
}

/// Prints a name out of its parts, as `First Last (@username)`.
/// Users without a username get `(@N/A)` instead.
#[must_use]
pub fn name_prettyprint(first_name: &str, last_name: Option<&str>, username: Option<&str>) -> String {
    let mut name = first_name.to_string();
    if let Some(last_name) = last_name {
        name.push(' ');
        name.push_str(last_name);
    }
    name.push_str(" (@");
    name.push_str(username.unwrap_or("N/A"));
    name.push(')');
    name
}

/// Tries to print the user in a way that is both readable and identifiable,
/// with full name, `@username`, and optionally user ID.
#[must_use]
pub fn user_name_prettyprint(user: &User, with_id: bool) -> String {
    let mut name = name_prettyprint(
        &user.first_name,
        user.last_name.as_deref(),
        user.username.as_deref(),
    );

    if with_id {
        use std::fmt::Write;
        write!(name, " (userid {})", user.id).expect("Writing to a String never fails");
    }

    name
}
