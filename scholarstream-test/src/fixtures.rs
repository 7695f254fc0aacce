//! Record builders for tests.

use scholarstream_core::{Application, Review, Scholarship, UserRecord};

pub fn scholarship(name: &str, university: &str, country: &str, application_fee: &str) -> Scholarship {
    Scholarship {
        scholarship_name: name.to_string(),
        university_name: university.to_string(),
        country: Some(country.to_string()),
        city: Some("Capital".to_string()),
        degree: Some("Masters".to_string()),
        scholarship_category: Some("Full fund".to_string()),
        subject_category: Some("Engineering".to_string()),
        application_fee: Some(application_fee.to_string()),
        tuition_fees: Some(application_fee.to_string()),
        ..Default::default()
    }
}

pub fn application(scholarship_id: &str, email: &str, university: &str) -> Application {
    Application {
        scholarship_id: scholarship_id.to_string(),
        user_email: email.to_string(),
        user_name: Some("Student".to_string()),
        scholarship_name: format!("{university} Scholarship"),
        university_name: university.to_string(),
        application_fee: Some("25".to_string()),
        payment_status: Some("unpaid".to_string()),
        enrollment_status: Some("pending".to_string()),
        ..Default::default()
    }
}

pub fn review(scholarship_id: &str, email: &str, rating: u8, comment: &str) -> Review {
    Review {
        scholarship_id: scholarship_id.to_string(),
        email: email.to_string(),
        display_name: Some("Reviewer".to_string()),
        university_name: Some("Test University".to_string()),
        rating_point: Some(rating),
        review_comment: Some(comment.to_string()),
        ..Default::default()
    }
}

pub fn user(email: &str, role: &str) -> UserRecord {
    UserRecord {
        email: email.to_string(),
        display_name: Some(email.split('@').next().unwrap_or(email).to_string()),
        role: Some(role.to_string()),
        ..Default::default()
    }
}
