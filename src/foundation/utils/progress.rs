use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Adds a bar to `multi_progress` in the style every bar in the crate shares.
///
/// `unit` is printed after the position, e.g. "songs" or "%".
pub fn create_progress_bar(multi_progress: &MultiProgress, total: u64, unit: &str) -> ProgressBar {
    let progress = multi_progress.add(ProgressBar::new(total));
    if let Ok(style) = ProgressStyle::default_bar().template(&format!(
        "{{elapsed_precise}} [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {unit} {{msg}}"
    )) {
        progress.set_style(style.progress_chars("##-"));
    }
    progress
}

#[cfg(test)]
mod tests {
    use super::*;
    use indicatif::ProgressDrawTarget;

    #[test]
    fn test_create_progress_bar_tracks_length() {
        let multi = MultiProgress::with_draw_target(ProgressDrawTarget::hidden());
        let bar = create_progress_bar(&multi, 42, "songs");

        bar.inc(2);
        assert_eq!(bar.length(), Some(42));
        assert_eq!(bar.position(), 2);
    }
}
