use crate::models::{ExtractionRequest, UploadedImage};

/// Persona and output-format rules for the model. Fixed, not user-configurable.
pub const SYSTEM_INSTRUCTION: &str = "You are an expert Feature Extractor and Image Analyzer. \
You should only give details as a List with a single Description. \
You possess the ability to extract colors, species, gender, places, \
daytime, objects, patterns, etc. Also, details must be bolded or highlighted \
with side headings. Side headings are required! \
You should not respond if you can't read the file and \
should say 'couldn't extract details'. \
Output should be in a list format.";

pub const USER_INSTRUCTION: &str = "Extract all relevant information from the image.";

/// Assemble the single-turn multimodal message. The system instruction must
/// precede the image and the user instruction must follow it.
pub fn build(image: UploadedImage) -> ExtractionRequest {
    ExtractionRequest {
        system_instruction: SYSTEM_INSTRUCTION.to_string(),
        user_instruction: USER_INSTRUCTION.to_string(),
        image,
    }
}
