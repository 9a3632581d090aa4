use crate::config::BrandingConfig;
use futures::stream::BoxStream;
use futures::{future, StreamExt};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

/// Branding values shown by the page header.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HeaderView {
    pub logo_url: String,
    pub logo_url_1: String,
    pub app_name: String,
}

/// Page header: fixed branding plus a "menu toggled" notification.
pub struct Header {
    view: HeaderView,
    menu_toggled: broadcast::Sender<()>,
}

impl Header {
    pub fn new(branding: &BrandingConfig) -> Self {
        let (menu_toggled, _) = broadcast::channel(8);
        Self {
            view: HeaderView {
                logo_url: branding.logo_url.clone(),
                logo_url_1: branding.logo_url_1.clone(),
                app_name: branding.app_name.clone(),
            },
            menu_toggled,
        }
    }

    pub fn view(&self) -> &HeaderView {
        &self.view
    }

    pub fn logo_url(&self) -> &str {
        &self.view.logo_url
    }

    pub fn logo_url_1(&self) -> &str {
        &self.view.logo_url_1
    }

    pub fn app_name(&self) -> &str {
        &self.view.app_name
    }

    /// Signals a menu toggle to every current listener.
    pub fn toggle_menu(&self) {
        let listeners = self.menu_toggled.send(()).unwrap_or(0);
        tracing::debug!("Menu toggled, {} listeners notified", listeners);
    }

    pub fn on_menu_toggle(&self) -> BoxStream<'static, ()> {
        BroadcastStream::new(self.menu_toggled.subscribe())
            .filter_map(|toggle| future::ready(toggle.ok()))
            .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    fn branding() -> BrandingConfig {
        BrandingConfig {
            logo_url: "assets/img/logo.svg".into(),
            logo_url_1: "assets/img/logo-dark.svg".into(),
            app_name: "Block Explorer".into(),
        }
    }

    #[test]
    fn exposes_branding_from_configuration() {
        let header = Header::new(&branding());

        assert_eq!(header.logo_url(), "assets/img/logo.svg");
        assert_eq!(header.logo_url_1(), "assets/img/logo-dark.svg");
        assert_eq!(header.app_name(), "Block Explorer");
    }

    #[test]
    fn toggling_without_listeners_is_harmless() {
        Header::new(&branding()).toggle_menu();
    }

    #[tokio::test(start_paused = true)]
    async fn listeners_receive_toggles_made_after_subscribing() {
        let header = Header::new(&branding());
        header.toggle_menu();

        let mut toggles = header.on_menu_toggle();
        header.toggle_menu();
        header.toggle_menu();

        assert_eq!(toggles.next().await, Some(()));
        assert_eq!(toggles.next().await, Some(()));
        assert!(timeout(Duration::from_secs(1), toggles.next()).await.is_err());
    }
}
