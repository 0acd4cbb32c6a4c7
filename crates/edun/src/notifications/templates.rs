use std::fmt::Write as _;

use chrono::{DateTime, Utc};

use super::{EmailMessage, Mailboxes};
use crate::submissions::domain::{ContactRecord, DonationRecord, VolunteerRecord};

pub const ORGANIZATION: &str = "Educate Nepal Initiative";
const INFO_ADDRESS: &str = "info@educatenepal.org";
const SUPPORT_ADDRESS: &str = "support@educatenepal.org";
const AUTOMATED_FOOTER: &str = "This is an automated message. Please do not reply to this email.";

fn timestamp(at: &DateTime<Utc>) -> String {
    at.format("%B %-d, %Y %H:%M UTC").to_string()
}

/// Thousands separators, at most two decimals, trailing zeros dropped.
pub fn format_amount(amount: f64) -> String {
    let rounded = format!("{:.2}", amount.abs());
    let (whole, fraction) = rounded.split_once('.').unwrap_or((rounded.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (index, digit) in whole.chars().enumerate() {
        if index > 0 && (whole.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let fraction = fraction.trim_end_matches('0');
    let sign = if amount < 0.0 { "-" } else { "" };
    if fraction.is_empty() {
        format!("{sign}{grouped}")
    } else {
        format!("{sign}{grouped}.{fraction}")
    }
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

fn contact_lines(text: &mut String, record: &ContactRecord) {
    writeln!(text, "Name: {}", record.name).expect("write name");
    writeln!(text, "Email: {}", record.email).expect("write email");
    if let Some(phone) = &record.phone {
        writeln!(text, "Phone: {phone}").expect("write phone");
    }
    if let Some(interest) = record.interest {
        writeln!(text, "Interest: {}", interest.label()).expect("write interest");
    }
}

pub fn contact_notification(mailboxes: &Mailboxes, record: &ContactRecord) -> EmailMessage {
    let mut text = String::from("New contact form submission received:\n\n");
    contact_lines(&mut text, record);
    writeln!(text, "\nMessage:\n{}\n", record.message).expect("write message");
    writeln!(text, "Submitted at: {}", record.created_at.to_rfc3339()).expect("write time");
    writeln!(text, "Form ID: {}", record.id).expect("write id");
    writeln!(
        text,
        "IP Address: {}",
        record.ip_address.as_deref().unwrap_or("Not available")
    )
    .expect("write ip");
    writeln!(
        text,
        "User Agent: {}",
        record.user_agent.as_deref().unwrap_or("Not available")
    )
    .expect("write user agent");

    EmailMessage {
        from: mailboxes.from.clone(),
        to: vec![mailboxes.notifications.clone()],
        subject: format!("New Contact Form Submission: {}", record.subject),
        text,
        html: None,
    }
}

pub fn contact_confirmation(mailboxes: &Mailboxes, record: &ContactRecord) -> EmailMessage {
    let mut text = format!("Dear {},\n\n", record.name);
    writeln!(
        text,
        "Thank you for reaching out to {ORGANIZATION}. We have received your message and will get back to you as soon as possible.\n"
    )
    .expect("write greeting");
    text.push_str("Here's a copy of your submission:\n\n");
    writeln!(text, "Subject: {}", record.subject).expect("write subject");
    contact_lines(&mut text, record);
    writeln!(text, "\nMessage:\n{}\n", record.message).expect("write message");
    writeln!(text, "Submitted on: {}\n", timestamp(&record.created_at)).expect("write time");
    writeln!(text, "Best regards,\nThe {ORGANIZATION} Team\n\n---\n{AUTOMATED_FOOTER}")
        .expect("write signature");

    EmailMessage {
        from: mailboxes.from.clone(),
        to: vec![record.email.clone()],
        subject: format!("Thank you for contacting {ORGANIZATION}"),
        text,
        html: None,
    }
}

pub fn volunteer_notification(mailboxes: &Mailboxes, record: &VolunteerRecord) -> EmailMessage {
    let mut text = String::from("New volunteer application received:\n\n");
    writeln!(text, "Name: {}", record.name).expect("write name");
    writeln!(text, "Email: {}", record.email).expect("write email");
    writeln!(text, "Phone: {}", record.phone).expect("write phone");
    writeln!(text, "Skills: {}", record.skills_line()).expect("write skills");
    writeln!(text, "Availability: {}", record.availability).expect("write availability");
    writeln!(text, "Experience: {}", record.experience).expect("write experience");
    writeln!(text, "Motivation: {}\n", record.motivation).expect("write motivation");
    writeln!(text, "Submitted at: {}", record.created_at.to_rfc3339()).expect("write time");
    writeln!(text, "Application ID: {}", record.id).expect("write id");

    EmailMessage {
        from: mailboxes.from.clone(),
        to: vec![mailboxes.notifications.clone()],
        subject: format!("New Volunteer Application: {}", record.name),
        text,
        html: None,
    }
}

pub fn volunteer_confirmation(mailboxes: &Mailboxes, record: &VolunteerRecord) -> EmailMessage {
    let mut text = format!("Dear {},\n\n", record.name);
    writeln!(
        text,
        "Thank you for your interest in volunteering with {ORGANIZATION}!\n\nWe have received your application and will review it within 48 hours. Our team will contact you soon to discuss next steps.\n"
    )
    .expect("write greeting");
    text.push_str("Application Details:\n");
    writeln!(text, "- Application ID: {}", record.id).expect("write id");
    writeln!(text, "- Submitted: {}", timestamp(&record.created_at)).expect("write time");
    writeln!(text, "- Skills: {}", record.skills_line()).expect("write skills");
    writeln!(text, "- Availability: {}\n", record.availability).expect("write availability");
    writeln!(
        text,
        "If you have any questions, please don't hesitate to contact us at {INFO_ADDRESS}.\n\nBest regards,\n{ORGANIZATION} Team"
    )
    .expect("write signature");

    EmailMessage {
        from: mailboxes.from.clone(),
        to: vec![record.email.clone()],
        subject: format!("Thank you for your volunteer application - {ORGANIZATION}"),
        text,
        html: None,
    }
}

pub fn donation_confirmation(mailboxes: &Mailboxes, record: &DonationRecord) -> EmailMessage {
    let amount = format_amount(record.amount);
    let method = record.payment_method.display_name();
    let privacy = if record.anonymous {
        "anonymous"
    } else {
        "not anonymous"
    };

    let mut text = String::from("Thank You for Your Generous Donation!\n\n");
    writeln!(text, "Dear {},\n", record.donor_name).expect("write greeting");
    writeln!(
        text,
        "We are incredibly grateful for your support of {ORGANIZATION}. Your contribution will help us continue our mission to provide education to underprivileged children in Nepal.\n"
    )
    .expect("write thanks");
    text.push_str("DONATION DETAILS:\n");
    writeln!(text, "- Donation ID: {}", record.id).expect("write id");
    writeln!(text, "- Amount: {} {amount}", record.currency).expect("write amount");
    writeln!(text, "- Payment Method: {method}").expect("write method");
    if let Some(message) = &record.message {
        writeln!(text, "- Your Message: {message}").expect("write message");
    }
    writeln!(
        text,
        "\nYour donation is {privacy}. Thank you for your trust in our cause.\n\nIf you have any questions about your donation, please contact us at {SUPPORT_ADDRESS}\n\nWith gratitude,\nThe {ORGANIZATION} Team\n\n---\n{AUTOMATED_FOOTER}"
    )
    .expect("write closing");

    let mut html = String::from("<html><body>");
    html.push_str("<h2>Thank You for Your Generous Donation!</h2>");
    writeln!(html, "<p>Dear {},</p>", escape_html(&record.donor_name)).expect("write greeting");
    writeln!(
        html,
        "<p>We are incredibly grateful for your support of {ORGANIZATION}. Your contribution will help us continue our mission to provide education to underprivileged children in Nepal.</p>"
    )
    .expect("write thanks");
    html.push_str("<h3>Donation Details:</h3><ul>");
    writeln!(html, "<li><strong>Donation ID:</strong> {}</li>", record.id).expect("write id");
    writeln!(
        html,
        "<li><strong>Amount:</strong> {} {amount}</li>",
        escape_html(&record.currency)
    )
    .expect("write amount");
    writeln!(html, "<li><strong>Payment Method:</strong> {method}</li>").expect("write method");
    if let Some(message) = &record.message {
        writeln!(
            html,
            "<li><strong>Your Message:</strong> {}</li>",
            escape_html(message)
        )
        .expect("write message");
    }
    html.push_str("</ul>");
    writeln!(
        html,
        "<p>Your donation is {privacy}. Thank you for your trust in our cause.</p><p>If you have any questions about your donation, please reply to this email or contact us at {SUPPORT_ADDRESS}</p><p>With gratitude,<br>The {ORGANIZATION} Team</p><hr><p style=\"color: #666; font-size: 12px;\">{AUTOMATED_FOOTER}</p>"
    )
    .expect("write closing");
    html.push_str("</body></html>");

    EmailMessage {
        from: mailboxes.from.clone(),
        to: vec![record.donor_email.clone()],
        subject: format!("Thank You for Your Donation to {ORGANIZATION}"),
        text,
        html: Some(html),
    }
}

pub fn donation_notification(mailboxes: &Mailboxes, record: &DonationRecord) -> EmailMessage {
    let amount = format_amount(record.amount);
    let method = record.payment_method.display_name();
    let donor = if record.anonymous {
        "Anonymous"
    } else {
        record.donor_name.as_str()
    };

    let mut text = format!("NEW DONATION RECEIVED\n\nA new donation has been made to {ORGANIZATION}.\n\nDONATION DETAILS:\n");
    writeln!(text, "- Donation ID: {}", record.id).expect("write id");
    writeln!(text, "- Donor Name: {donor}").expect("write donor");
    if !record.anonymous {
        writeln!(text, "- Donor Email: {}", record.donor_email).expect("write email");
    }
    writeln!(text, "- Amount: {} {amount}", record.currency).expect("write amount");
    writeln!(text, "- Payment Method: {method}").expect("write method");
    if let Some(message) = &record.message {
        writeln!(text, "- Donor Message: {message}").expect("write message");
    }
    writeln!(text, "- Status: {}", record.status.label()).expect("write status");
    writeln!(text, "- Timestamp: {}\n", timestamp(&record.created_at)).expect("write time");
    text.push_str("This is an automated notification. No action is required.\n");

    let mut html = String::from("<html><body><h2>New Donation Received</h2>");
    writeln!(
        html,
        "<p>A new donation has been made to {ORGANIZATION}.</p><h3>Donation Details:</h3><ul>"
    )
    .expect("write intro");
    writeln!(html, "<li><strong>Donation ID:</strong> {}</li>", record.id).expect("write id");
    writeln!(
        html,
        "<li><strong>Donor Name:</strong> {}</li>",
        escape_html(donor)
    )
    .expect("write donor");
    if !record.anonymous {
        writeln!(
            html,
            "<li><strong>Donor Email:</strong> {}</li>",
            escape_html(&record.donor_email)
        )
        .expect("write email");
    }
    writeln!(
        html,
        "<li><strong>Amount:</strong> {} {amount}</li>",
        escape_html(&record.currency)
    )
    .expect("write amount");
    writeln!(html, "<li><strong>Payment Method:</strong> {method}</li>").expect("write method");
    if let Some(message) = &record.message {
        writeln!(
            html,
            "<li><strong>Donor Message:</strong> {}</li>",
            escape_html(message)
        )
        .expect("write message");
    }
    writeln!(
        html,
        "<li><strong>Timestamp:</strong> {}</li></ul>",
        timestamp(&record.created_at)
    )
    .expect("write time");
    html.push_str("<p>This is an automated notification. No action is required.</p></body></html>");

    EmailMessage {
        from: mailboxes.from.clone(),
        to: vec![mailboxes.notifications.clone()],
        subject: format!(
            "New Donation Received: {} {amount} from {donor}",
            record.currency
        ),
        text,
        html: Some(html),
    }
}
