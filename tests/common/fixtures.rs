//! HTML fixtures and mock server helpers

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Front page listing with one entry per `(id, href)` pair
pub fn front_page(entries: &[(&str, &str)]) -> String {
    let rows: String = entries
        .iter()
        .enumerate()
        .map(|(rank, (id, href))| {
            format!(
                r#"<tr class="athing submission" id="{id}">
                    <td class="title"><span class="rank">{}.</span></td>
                    <td class="title"><span class="titleline"><a href="{href}">Story {id}</a></span></td>
                </tr>
                <tr><td class="subtext"><a href="item?id={id}">discuss</a></td></tr>"#,
                rank + 1
            )
        })
        .collect();
    format!(r#"<html><body><table id="hnmain"><tr><td><table>{rows}</table></td></tr></table></body></html>"#)
}

/// Comment thread with one comment per href
pub fn comment_page(hrefs: &[&str]) -> String {
    let comments: String = hrefs
        .iter()
        .map(|href| {
            format!(
                r#"<tr class="athing comtr"><td><div class="comment"><span class="commtext c00">Worth reading: <a href="{href}" rel="nofollow">{href}</a></span></div></td></tr>"#
            )
        })
        .collect();
    format!("<html><body><table>{comments}</table></body></html>")
}

/// 200 response with an HTML body
pub fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_raw(body, "text/html; charset=utf-8")
}

/// Serve `body` as HTML at `route`
pub async fn mount_html(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(html(body))
        .mount(server)
        .await;
}

/// Serve `body` as the comment thread of `item_id`
pub async fn mount_comments(server: &MockServer, item_id: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path("/item"))
        .and(query_param("id", item_id))
        .respond_with(html(body))
        .mount(server)
        .await;
}
