//! Keys into the library of pre-recorded Arabic number fragments.
//!
//! Each key names a file `{basePath}/{key}.mp3`. The decomposition below is
//! the addressing scheme of that library and must not drift.

/// "and"
pub const CONJUNCTION: &str = "wa";
/// "client number"
pub const CLIENT_NUMBER: &str = "client_number";
/// "proceed to"
pub const PROCEED_TO: &str = "proceed_to";
/// Played for queue resets.
pub const RESET: &str = "reset";

const CLINIC_PREFIX: &str = "clinic_";

/// Spoken-order fragment keys for a ticket number.
///
/// Units precede tens ("three and twenty"), and `wa` joins each non-zero
/// group to a non-zero remainder.
pub fn fragments_for(n: u32) -> Vec<String> {
    if n == 0 {
        return vec!["0".to_string()];
    }

    let mut keys = Vec::new();
    let thousands = n / 1000;
    let below_thousand = n % 1000;
    let hundreds = below_thousand / 100;
    let below_hundred = below_thousand % 100;

    match thousands {
        0 => {}
        1 => keys.push("1000".to_string()),
        2 => keys.push("2000".to_string()),
        t => {
            keys.push(t.to_string());
            keys.push("1000".to_string());
        }
    }
    if thousands > 0 && below_thousand > 0 {
        keys.push(CONJUNCTION.to_string());
    }

    if hundreds > 0 {
        keys.push((hundreds * 100).to_string());
    }
    if hundreds > 0 && below_hundred > 0 {
        keys.push(CONJUNCTION.to_string());
    }

    match below_hundred {
        0 => {}
        1..=19 => keys.push(below_hundred.to_string()),
        _ => {
            let units = below_hundred % 10;
            if units > 0 {
                keys.push(units.to_string());
                keys.push(CONJUNCTION.to_string());
            }
            keys.push((below_hundred - units).to_string());
        }
    }

    keys
}

/// Fragment key for a clinic name, every whitespace character replaced by `_`.
pub fn clinic_fragment(clinic_name: &str) -> String {
    let mut key = String::with_capacity(CLINIC_PREFIX.len() + clinic_name.len());
    key.push_str(CLINIC_PREFIX);
    key.extend(
        clinic_name
            .chars()
            .map(|c| if c.is_whitespace() { '_' } else { c }),
    );
    key
}

/// Full playlist for calling a ticket.
pub fn ticket_playlist(number: u32, clinic_name: &str) -> Vec<String> {
    let mut playlist = vec![CLIENT_NUMBER.to_string()];
    playlist.extend(fragments_for(number));
    playlist.push(PROCEED_TO.to_string());
    playlist.push(clinic_fragment(clinic_name));
    playlist
}

/// URL of a fragment file under `base_path`.
pub fn fragment_url(base_path: &str, key: &str) -> String {
    if base_path.ends_with('/') {
        format!("{}{}.mp3", base_path, key)
    } else {
        format!("{}/{}.mp3", base_path, key)
    }
}
