//! Chromium-based page source using chromiumoxide.

use crate::acquisition::PageSource;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Find the Chromium binary path.
pub fn find_chromium() -> Option<PathBuf> {
    // 1. ONLINE_WATCH_CHROMIUM_PATH env
    if let Ok(p) = std::env::var("ONLINE_WATCH_CHROMIUM_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. ~/.online-watch/chromium/
    if let Some(home) = dirs::home_dir() {
        let candidates = if cfg!(target_os = "macos") {
            vec![
                home.join(".online-watch/chromium/chrome-mac-arm64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".online-watch/chromium/chrome-mac-x64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
            ]
        } else {
            vec![home.join(".online-watch/chromium/chrome-linux64/chrome")]
        };
        if let Some(found) = candidates.into_iter().find(|c| c.exists()) {
            return Some(found);
        }
    }

    // 3. System PATH
    for name in ["google-chrome", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    // 4. Common macOS location
    if cfg!(target_os = "macos") {
        let common =
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// Headless Chromium that renders each page before handing back its markup.
pub struct ChromiumRenderer {
    browser: Browser,
}

impl ChromiumRenderer {
    /// Launch a headless Chromium instance that identifies as `user_agent`.
    pub async fn launch(user_agent: &str) -> Result<Self> {
        let chrome_path = find_chromium()
            .context("Chromium not found. Set ONLINE_WATCH_CHROMIUM_PATH or install Chrome.")?;

        let config = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg(format!("--user-agent={user_agent}"))
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch Chromium")?;

        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        Ok(Self { browser })
    }

    async fn render(&self, url: &str, timeout_ms: u64) -> Result<String> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .context("failed to create new page")?;

        let start = Instant::now();
        let nav = tokio::time::timeout(Duration::from_millis(timeout_ms), async {
            page.goto(url).await?;
            page.wait_for_navigation().await?;
            Ok::<_, chromiumoxide::error::CdpError>(())
        })
        .await;

        let html = match nav {
            Ok(Ok(())) => {
                tracing::debug!("rendered {url} in {}ms", start.elapsed().as_millis());
                page.evaluate("document.documentElement.outerHTML")
                    .await
                    .context("failed to get HTML")?
                    .into_value::<String>()
                    .map_err(|e| anyhow::anyhow!("failed to convert HTML result: {e:?}"))
            }
            Ok(Err(e)) => Err(anyhow::anyhow!("navigation failed: {e}")),
            Err(_) => Err(anyhow::anyhow!("navigation timed out after {timeout_ms}ms")),
        };

        let _ = page.close().await;
        html
    }

    /// Close the browser.
    pub async fn shutdown(mut self) -> Result<()> {
        if let Err(e) = self.browser.close().await {
            bail!("failed to close Chromium: {e}");
        }
        Ok(())
    }
}

#[async_trait]
impl PageSource for ChromiumRenderer {
    async fn fetch_text(&self, url: &str, timeout_ms: u64) -> Result<String> {
        self.render(url, timeout_ms).await
    }

    fn name(&self) -> &'static str {
        "chromium"
    }
}
