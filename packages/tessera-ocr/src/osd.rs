use serde::Serialize;

/// Orientation and script detection result. Fields the engine did not
/// report, or reported with an invalid value, are `None`.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Osd {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_num: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orientation: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orientation_conf: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script_conf: Option<f64>,
}

impl Osd {
    /// Parses `key: value` lines. Unknown keys and values that do not fit
    /// the field type are dropped.
    pub fn parse(text: &str) -> Self {
        let mut osd = Osd::default();
        for line in text.split('\n') {
            let parts: Vec<&str> = line.split(": ").collect();
            let [key, value] = parts.as_slice() else {
                continue;
            };
            match *key {
                "Page number" => osd.page_num = parse_int(value).or(osd.page_num),
                "Orientation in degrees" => osd.orientation = parse_int(value).or(osd.orientation),
                "Rotate" => osd.rotate = parse_int(value).or(osd.rotate),
                "Orientation confidence" => {
                    osd.orientation_conf = parse_float(value).or(osd.orientation_conf)
                }
                "Script" => osd.script = Some(value.to_string()),
                "Script confidence" => osd.script_conf = parse_float(value).or(osd.script_conf),
                _ => {}
            }
        }
        osd
    }

    pub fn is_empty(&self) -> bool {
        *self == Osd::default()
    }
}

fn parse_int(value: &str) -> Option<u32> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

fn parse_float(value: &str) -> Option<f64> {
    value.trim().parse().ok()
}
