//! Sign-in activity flattening.

use serde_json::Value;

use crate::types::SignInEntry;

/// Recognized `(timestamp, request id)` key pairs, in output order.
pub const SIGN_IN_PAIRS: [(&str, &str); 3] = [
    ("lastSignInDateTime", "lastSignInRequestId"),
    ("lastNonInteractiveSignInDateTime", "lastNonInteractiveSignInRequestId"),
    ("lastSuccessfulSignInDateTime", "lastSuccessfulSignInRequestId"),
];

/// Flatten one nested sign-in object into entries referencing `user_id`.
///
/// An entry is produced for each pair whose timestamp and request id are both present as strings.
/// A non-object `activity` yields nothing.
pub fn flatten_sign_in(user_id: &str, activity: &Value) -> Vec<SignInEntry> {
    let Some(map) = activity.as_object() else {
        return Vec::new();
    };

    SIGN_IN_PAIRS
        .iter()
        .filter_map(|(ts_key, req_key)| {
            let time_stamp = map.get(*ts_key)?.as_str()?;
            let request_id = map.get(*req_key)?.as_str()?;
            Some(SignInEntry {
                user_id: user_id.to_string(),
                time_stamp: time_stamp.to_string(),
                request_id: request_id.to_string(),
                kind: (*ts_key).to_string(),
            })
        })
        .collect()
}
