#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

fn main() {
    lq_desktop_lib::run()
}
