use crate::error::ErrorKind;

/// Headline shown for an error of `kind`. Kinds without a fixed headline
/// show the error's own message.
pub fn headline(kind: ErrorKind) -> Option<&'static str> {
    let text = match kind {
        ErrorKind::NetworkError => "Network connection lost. Please check your internet connection.",
        ErrorKind::AuthError => "Your session has expired. Please log in again.",
        ErrorKind::RateLimitError => "Too many requests. Please wait before trying again.",
        ErrorKind::ServerError => "Server is temporarily unavailable. Please try again later.",
        ErrorKind::DocumentScanError => {
            "Document scanning failed. Please make sure the image is clear and well lit."
        }
        ErrorKind::FacialRecognitionError => {
            "Facial recognition failed. Please make sure your face is well lit and centred."
        }
        ErrorKind::AadhaarOtpError => {
            "Aadhaar verification failed. Please check your number and try again."
        }
        ErrorKind::PersistenceExhausted => {
            "Your progress could not be saved. It is kept on this device until the next attempt."
        }
        ErrorKind::BreakerOpen => {
            "The verification service is temporarily unavailable. Please try again in a minute."
        }
        ErrorKind::RequestError | ErrorKind::UnknownError => return None,
    };
    Some(text)
}

/// Fixed troubleshooting tips for `kind`.
pub fn tips(kind: ErrorKind) -> &'static [&'static str] {
    match kind {
        ErrorKind::NetworkError => &[
            "Check your internet connection",
            "Try switching to a different network",
            "Restart your router if the problem persists",
        ],
        ErrorKind::AuthError => &[
            "Log in again with your credentials",
            "Contact support if the issue continues",
        ],
        ErrorKind::RateLimitError => &[
            "Wait a few minutes before trying again",
            "Avoid repeating the same action in quick succession",
        ],
        ErrorKind::ServerError | ErrorKind::BreakerOpen => &[
            "Wait a few minutes and try again",
            "Check the service status page for outages",
            "Contact support if the problem persists",
        ],
        ErrorKind::DocumentScanError => &[
            "Make sure the document is well lit and in focus",
            "Place the document on a flat surface",
            "Keep all four edges of the card inside the frame",
            "Try a different image format",
        ],
        ErrorKind::FacialRecognitionError => &[
            "Make sure your face is evenly lit",
            "Remove glasses or headwear",
            "Position your face in the centre of the frame",
            "Hold still while the photo is taken",
        ],
        ErrorKind::AadhaarOtpError => &[
            "Check that your Aadhaar number is correct",
            "Make sure your mobile number is registered with UIDAI",
            "Wait 30 seconds before requesting another OTP",
        ],
        ErrorKind::PersistenceExhausted => &[
            "Keep this session open until your connection returns",
            "Free up disk space on this device",
        ],
        ErrorKind::RequestError | ErrorKind::UnknownError => &[
            "Try the operation again",
            "Check your internet connection",
            "Contact 24/7 support for assistance",
        ],
    }
}
