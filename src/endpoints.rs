//! Paths of the microblog API routes the client talks to.

pub const AUTH_LOGIN: &str = "/auth/login";
pub const REGISTRATION: &str = "/registration";
pub const REGISTRATION_CONFIRM: &str = "/registration/confirm";
pub const USER: &str = "/user";
pub const USER_ME: &str = "/user/me";
pub const USER_FOLLOW: &str = "/user/follow";
pub const USER_UNFOLLOW: &str = "/user/unfollow";
pub const POST: &str = "/post";
pub const MEDIA: &str = "/media";

fn with_cursor(path: String, name: &str, cursor: Option<i64>) -> String {
    match cursor.filter(|c| *c > 0) {
        Some(c) => format!("{path}?{name}={c}"),
        None => path,
    }
}

pub fn user(login: &str) -> String {
    format!("{USER}/{}", urlencoding::encode(login))
}

/// `lfid` is the last follower already shown; the next page starts after it.
pub fn user_followers(login: &str, latest_follower_id: Option<i64>) -> String {
    with_cursor(
        format!("{USER}/{}/followers", urlencoding::encode(login)),
        "lfid",
        latest_follower_id,
    )
}

pub fn user_following(login: &str, latest_follower_id: Option<i64>) -> String {
    with_cursor(
        format!("{USER}/{}/following", urlencoding::encode(login)),
        "lfid",
        latest_follower_id,
    )
}

pub fn user_posts(user_id: i64, latest_post_id: Option<i64>) -> String {
    with_cursor(format!("{POST}/user/{user_id}"), "lpid", latest_post_id)
}

pub fn feed(user_id: i64, latest_post_id: Option<i64>) -> String {
    with_cursor(format!("{POST}/feed/{user_id}"), "lpid", latest_post_id)
}

pub fn post_search(query: &str, query_id: Option<i64>, offset: u32) -> String {
    let mut path = format!("{POST}/search?query={}", urlencoding::encode(query));
    if let Some(id) = query_id {
        path.push_str(&format!("&query_id={id}"));
    }
    if offset > 0 {
        path.push_str(&format!("&offset={offset}"));
    }
    path
}

pub fn media(service: &str, ids: &[i64]) -> String {
    let ids = ids
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",");
    format!(
        "{MEDIA}?service={}&ids={}",
        urlencoding::encode(service),
        urlencoding::encode(&ids)
    )
}
