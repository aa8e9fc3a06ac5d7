// GNU AGPL v3 License

use super::ConvertOption;

/// Generates a palette from the clip itself and encodes against it.
const PALETTE_CHAIN: &str = "split[a][b];[a]palettegen[p];[b][p]paletteuse";

/// The video filters requested by `option`, in application order.
pub(super) fn video_filters(option: &ConvertOption) -> Vec<String> {
    let mut filters = Vec::new();

    if let Some(fps) = option.fps.filter(|f| *f > 0) {
        filters.push(format!("fps={}", fps));
    }

    // zero means "unset", same as missing
    let width = option.width.filter(|w| *w > 0);
    let height = option.height.filter(|h| *h > 0);
    if width.is_some() || height.is_some() {
        filters.push(format!(
            "scale=w={}:h={}",
            dimension(width),
            dimension(height)
        ));
    }

    if !option.crop.is_full() {
        let crop = option.crop;
        filters.push(format!(
            "crop=in_w*({}/100):in_h*({}/100):in_w*({}/100):in_h*({}/100)",
            crop.width, crop.height, crop.x, crop.y
        ));
    }

    if option.palette {
        filters.push(PALETTE_CHAIN.to_string());
    }

    filters
}

/// Wire the filter chain up to the inputs.
///
/// A single input takes a plain `-vf`. Several inputs are concatenated first
/// inside a complex graph whose output is mapped explicitly.
pub(super) fn filter_args(input_count: usize, filters: &[String]) -> Vec<String> {
    if input_count <= 1 {
        if filters.is_empty() {
            return Vec::new();
        }
        return vec!["-vf".to_string(), filters.join(",")];
    }

    let streams = (0..input_count)
        .map(|i| format!("[{}:v]", i))
        .collect::<String>();
    let mut graph = format!("{}concat=n={}:v=1:a=0", streams, input_count);
    for filter in filters {
        graph.push(',');
        graph.push_str(filter);
    }
    graph.push_str("[out]");

    vec![
        "-filter_complex".to_string(),
        graph,
        "-map".to_string(),
        "[out]".to_string(),
    ]
}

fn dimension(value: Option<u32>) -> String {
    value.map_or_else(|| "-1".to_string(), |v| v.to_string())
}
