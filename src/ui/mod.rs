use iced::{
    widget::{
        button, column, container, pick_list, progress_bar, row, scrollable, text, text_input,
        toggler, Space,
    },
    Element, Length,
};

use crate::domain::Quality;

/// Main view state
pub struct DownloadView {
    pub youtube_url: String,
    pub output_dir: String,
    pub quality: Quality,
    pub audio_only: bool,
    pub allow_playlist: bool,
    pub use_cookies: bool,
    pub is_downloading: bool,
    /// 0..=100
    pub progress_percent: f32,
    pub progress_info: String,
    pub log_text: String,
}

impl Default for DownloadView {
    fn default() -> Self {
        Self {
            youtube_url: String::new(),
            output_dir: String::new(),
            quality: Quality::Best,
            audio_only: false,
            allow_playlist: false,
            use_cookies: false,
            is_downloading: false,
            progress_percent: 0.0,
            progress_info: String::new(),
            log_text: String::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum DownloadMessage {
    UrlChanged(String),
    OutputDirChanged(String),
    QualitySelected(Quality),
    AudioOnlyToggled(bool),
    PlaylistToggled(bool),
    CookiesToggled(bool),
    ClearPressed,
    PastePressed,
    /// Clipboard contents, `None` when it held no text
    UrlPasted(Option<String>),
    BrowsePressed,
    BatchPressed,
    DownloadPressed,
}

impl DownloadView {
    pub fn update(&mut self, message: DownloadMessage) {
        // The form is frozen while a run is active.
        if self.is_downloading {
            return;
        }

        match message {
            DownloadMessage::UrlChanged(url) => self.youtube_url = url,
            DownloadMessage::OutputDirChanged(dir) => self.output_dir = dir,
            DownloadMessage::QualitySelected(quality) => self.quality = quality,
            DownloadMessage::AudioOnlyToggled(value) => self.audio_only = value,
            DownloadMessage::PlaylistToggled(value) => self.allow_playlist = value,
            DownloadMessage::CookiesToggled(value) => self.use_cookies = value,
            DownloadMessage::ClearPressed => self.youtube_url.clear(),
            DownloadMessage::UrlPasted(Some(text)) => self.youtube_url = text.trim().to_string(),
            DownloadMessage::UrlPasted(None) => {}
            DownloadMessage::PastePressed
            | DownloadMessage::BrowsePressed
            | DownloadMessage::BatchPressed
            | DownloadMessage::DownloadPressed => {
                // Will be handled by the app
            }
        }
    }

    pub fn status_label(&self) -> &'static str {
        if self.is_downloading {
            "Downloading…"
        } else {
            "Ready"
        }
    }

    pub fn view(&self) -> Element<'_, DownloadMessage> {
        let idle = !self.is_downloading;

        let url_row = row![
            text_input("https://www.youtube.com/watch?v=…", &self.youtube_url)
                .on_input_maybe(idle.then_some(DownloadMessage::UrlChanged))
                .padding(10)
                .width(Length::Fill),
            button("Paste")
                .on_press_maybe(idle.then_some(DownloadMessage::PastePressed))
                .padding([10, 16]),
            button("Clear")
                .on_press_maybe(idle.then_some(DownloadMessage::ClearPressed))
                .padding([10, 16]),
        ]
        .spacing(10);

        let output_row = row![
            text_input("Output folder", &self.output_dir)
                .on_input_maybe(idle.then_some(DownloadMessage::OutputDirChanged))
                .padding(10)
                .width(Length::Fill),
            button("Browse…")
                .on_press_maybe(idle.then_some(DownloadMessage::BrowsePressed))
                .padding([10, 16]),
        ]
        .spacing(10);

        let options_row = row![
            text("Quality:").size(14),
            pick_list(
                Quality::ALL,
                Some(self.quality),
                DownloadMessage::QualitySelected
            )
            .padding(8),
            toggler(self.audio_only)
                .label("Audio only (MP3)")
                .on_toggle_maybe(idle.then_some(DownloadMessage::AudioOnlyToggled)),
            toggler(self.allow_playlist)
                .label("Allow playlist")
                .on_toggle_maybe(idle.then_some(DownloadMessage::PlaylistToggled)),
            toggler(self.use_cookies)
                .label("Use browser cookies")
                .on_toggle_maybe(idle.then_some(DownloadMessage::CookiesToggled)),
        ]
        .spacing(16)
        .align_y(iced::alignment::Vertical::Center);

        let actions_row = row![
            button("Download")
                .on_press_maybe(idle.then_some(DownloadMessage::DownloadPressed))
                .padding([10, 20]),
            button("Batch from file…")
                .on_press_maybe(idle.then_some(DownloadMessage::BatchPressed))
                .padding([10, 20]),
            Space::new().width(Length::Fill),
            text(self.status_label()).size(14),
        ]
        .spacing(10)
        .align_y(iced::alignment::Vertical::Center);

        let log = container(
            scrollable(text(&self.log_text).size(12).width(Length::Fill))
                .anchor_bottom()
                .height(Length::Fill),
        )
        .padding(8)
        .width(Length::Fill)
        .height(Length::Fill)
        .style(container::bordered_box);

        column![
            text("YouTube Downloader").size(28),
            Space::new().height(Length::Fixed(10.0)),
            text("Video or playlist URL:").size(16),
            url_row,
            text("Save to:").size(16),
            output_row,
            options_row,
            actions_row,
            progress_bar(0.0..=100.0, self.progress_percent),
            text(&self.progress_info).size(12),
            log,
        ]
        .padding(20)
        .spacing(10)
        .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_updates() {
        let mut view = DownloadView::default();
        view.update(DownloadMessage::UrlChanged("https://youtu.be/abc123XYZ".into()));
        view.update(DownloadMessage::QualitySelected(Quality::P480));
        view.update(DownloadMessage::AudioOnlyToggled(true));
        view.update(DownloadMessage::CookiesToggled(true));

        assert_eq!(view.quality, Quality::P480);
        assert!(view.audio_only);
        assert!(view.use_cookies);

        view.update(DownloadMessage::ClearPressed);
        assert!(view.youtube_url.is_empty());
    }

    #[test]
    fn test_cookies_off_by_default() {
        assert!(!DownloadView::default().use_cookies);
    }

    #[test]
    fn test_pasted_url_is_trimmed() {
        let mut view = DownloadView::default();
        view.update(DownloadMessage::UrlPasted(Some("  https://youtu.be/abc123XYZ\n".into())));
        assert_eq!(view.youtube_url, "https://youtu.be/abc123XYZ");

        view.update(DownloadMessage::UrlPasted(None));
        assert_eq!(view.youtube_url, "https://youtu.be/abc123XYZ");
    }

    #[test]
    fn test_form_frozen_while_downloading() {
        let mut view = DownloadView {
            youtube_url: "https://youtu.be/abc123XYZ".to_string(),
            output_dir: "/data/videos".to_string(),
            is_downloading: true,
            ..DownloadView::default()
        };

        view.update(DownloadMessage::ClearPressed);
        view.update(DownloadMessage::OutputDirChanged("/elsewhere".into()));
        view.update(DownloadMessage::CookiesToggled(true));
        view.update(DownloadMessage::UrlPasted(Some("https://youtu.be/other12345".into())));

        assert_eq!(view.youtube_url, "https://youtu.be/abc123XYZ");
        assert_eq!(view.output_dir, "/data/videos");
        assert!(!view.use_cookies);
    }

    #[test]
    fn test_status_label_follows_running_state() {
        let mut view = DownloadView::default();
        assert_eq!(view.status_label(), "Ready");
        view.is_downloading = true;
        assert_eq!(view.status_label(), "Downloading…");
    }
}
