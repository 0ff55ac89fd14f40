/// Framebuffer module - attachment descriptors, framebuffers and the bind guard

pub mod attachment;
pub mod framebuffer;

pub use attachment::{color_normal_position_attachments, single_color_attachment, AttachmentDescriptor};
pub use framebuffer::{BoundFramebuffer, Framebuffer};
