use anyhow::{Context, Result};
use chromiumoxide::handler::Handler;
use chromiumoxide::{Browser, Page};
use tokio::time::sleep;
use tracing::{debug, error, info};

/// 附加到已开启远程调试端口的浏览器
pub async fn attach_to_browser(port: u16) -> Result<(Browser, Handler)> {
    let browser_url = format!("http://localhost:{}", port);
    info!("正在连接到浏览器: {}", browser_url);

    let (browser, handler) = Browser::connect(&browser_url).await.map_err(|e| {
        error!("连接浏览器失败: {}", e);
        e
    })?;
    debug!("浏览器连接成功");
    Ok((browser, handler))
}

/// 获取要操作的页面
///
/// 优先复用地址以 `target_url` 开头的标签页，其次复用第一个空白页，都没有则新建。
/// 需要在事件循环启动之后调用。
pub async fn find_or_open_page(browser: &Browser, target_url: &str) -> Result<Page> {
    // 等待浏览器状态同步
    sleep(tokio::time::Duration::from_millis(300)).await;

    let pages = browser.pages().await.context("获取页面列表失败")?;
    debug!("获取到 {} 个页面", pages.len());

    let host = target_host(target_url);
    let mut blank = None;
    for page in pages {
        let url = page.url().await.ok().flatten().unwrap_or_default();
        debug!("检查页面: {}", url);
        if !host.is_empty() && url.contains(host) {
            info!("✓ 复用已打开的页面: {}", url);
            return Ok(page);
        }
        if blank.is_none() && (url.is_empty() || url.starts_with("about:blank")) {
            blank = Some(page);
        }
    }

    let page = match blank {
        Some(page) => page,
        None => browser.new_page("about:blank").await.map_err(|e| {
            error!("创建新页面失败: {}", e);
            e
        })?,
    };
    Ok(page)
}

/// `https://host/path` 中的 host
fn target_host(url: &str) -> &str {
    let rest = url.split_once("://").map(|(_, r)| r).unwrap_or(url);
    rest.split(['/', '?', '#']).next().unwrap_or_default()
}
