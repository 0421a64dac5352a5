pub const CHAT_SYSTEM_PROMPT: &str = "You are a helpful medical assistant providing general health information. Always clarify you are not a substitute for professional medical advice.";

pub const DEFAULT_IMAGE_QUERY: &str = "Please provide a medical assessment of what's shown in this image. You are a medical assistant analyzing medical images. Provide observations about what you see while being cautious not to make definitive diagnoses.";

pub const DISCLAIMER: &str = "\n\nDisclaimer: This is an AI assessment and not a substitute for professional medical advice. Please consult a healthcare provider for proper diagnosis and treatment.";
