use bot_commons::*;

fn main() {
    if std::env::var_os("RUST_LOG").is_none() {
        std::env::set_var("RUST_LOG", "WARN,deep_link_bot=info");
    }
    start_everything(deep_link_bot::entry());
}
