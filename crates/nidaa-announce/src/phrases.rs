//! Arabic texts spoken and shown for announcements.

/// Language tag set on every utterance.
pub const SPEECH_LANG: &str = "ar-SA";

/// Substring a voice's language must contain to be preferred.
pub const VOICE_LANG_MATCH: &str = "ar";

pub const SPEECH_PITCH: f64 = 1.0;

/// Spoken after a queue reset. ("Reset completed")
pub const RESET_SPEECH: &str = "تمت إعادة التعيين";

/// Shown when a reset carries no text of its own.
pub const RESET_NOTICE: &str = RESET_SPEECH;

/// Shown while an admin recording plays. ("Administrative call ...")
pub const RECORDING_NOTICE: &str = "نداء إداري ...";

/// Clinic name used when the called clinic no longer exists. ("The clinic")
pub const CLINIC_FALLBACK_NAME: &str = "العيادة";

/// Speech for a ticket call: "client number N, proceed to CLINIC".
pub fn ticket_speech(number: u32, clinic_name: &str) -> String {
    format!("عميل رقم {}، التوجه إلى {}", number, clinic_name)
}

/// Banner for a ticket call on the display.
pub fn ticket_notice(number: u32, clinic_name: &str) -> String {
    format!("العميل رقم {} - التوجه إلى {}", number, clinic_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticket_texts() {
        assert_eq!(ticket_speech(7, "الأسنان"), "عميل رقم 7، التوجه إلى الأسنان");
        assert_eq!(ticket_notice(7, "الأسنان"), "العميل رقم 7 - التوجه إلى الأسنان");
    }
}
