mod admin;
mod login;
mod logout;

pub(crate) use admin::{dashboard, maintenance, menu_page, orders_page, users_page};
pub(crate) use login::{show_login, submit_login};
pub(crate) use logout::logout;
