//! Request handlers.

mod http;
mod telemetry;
mod upload;
mod weather;
mod websocket;

pub use http::{
    get_online_users, get_room_detail, get_rooms, health_check, not_found, root, socket_health,
    socket_status,
};
pub use telemetry::{
    calibrate_sensor, network_status, network_topology, sensors_data, sensors_status,
    toggle_sensor,
};
pub use upload::upload_file;
pub use weather::current_weather;
pub use websocket::{default_namespace_handler, queries_namespace_handler};
