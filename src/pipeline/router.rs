//! Router — category to responder dispatch.
//!
//! A total function over the closed category set. The match has no default
//! arm: adding a `Category` variant without a responder is a compile error,
//! not a silent fallback at runtime.

use crate::pipeline::types::Category;
use crate::responders::{
    FollowUpResponder, InquiryResponder, MeetingResponder, Responder, SupportResponder,
};

/// Owns one responder per category.
pub struct Router {
    inquiry: InquiryResponder,
    support: SupportResponder,
    meeting: MeetingResponder,
    follow_up: FollowUpResponder,
}

impl Router {
    pub fn new(
        inquiry: InquiryResponder,
        support: SupportResponder,
        meeting: MeetingResponder,
        follow_up: FollowUpResponder,
    ) -> Self {
        Self {
            inquiry,
            support,
            meeting,
            follow_up,
        }
    }

    /// The responder for `category`.
    pub fn responder_for(&self, category: Category) -> &dyn Responder {
        match category {
            Category::Inquiry => &self.inquiry,
            Category::Support => &self.support,
            Category::Meeting => &self.meeting,
            Category::FollowUp => &self.follow_up,
        }
    }
}
