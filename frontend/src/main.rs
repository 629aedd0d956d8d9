use log::info;

use swipe_funnel::config;
use swipe_funnel::pages::funnel::FunnelPage;

fn main() {
    console_error_panic_hook::set_once();
    console_log::init_with_level(config::log_level()).expect("error initializing log");

    info!("Starting application");
    yew::Renderer::<FunnelPage>::new().render();
}
