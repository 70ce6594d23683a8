//! Traveler roster resolution.
//!
//! Both the fact table and the search surface list travelers, and the two must
//! agree on count, content and order. They both go through `resolve_roster`.
//!
//! Order: primary contact first, then assignments by `(ordinal, id)`. An
//! assignment repeating the primary contact's email is folded into the primary
//! entry. Names resolve from the assignment, then the contact book, then the
//! email itself; travelers with neither get "No Email N".

use crate::database::{Database, DatabaseResult};
use crate::models::{ClientAssignment, ContactRecord, Traveler, TripRecord};
use std::collections::HashMap;

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Resolve the ordered traveler list for a trip.
///
/// `contacts` is keyed by lowercased email.
pub fn resolve_roster(
    trip: &TripRecord,
    assignments: &[ClientAssignment],
    contacts: &HashMap<String, ContactRecord>,
) -> Vec<Traveler> {
    let mut ordered: Vec<&ClientAssignment> = assignments.iter().collect();
    ordered.sort_by_key(|a| (a.ordinal, a.id));

    let primary_email = non_blank(trip.primary_contact_email.as_deref());
    let primary_name = non_blank(trip.primary_contact_name.as_deref());

    // (explicit name, email) before fallback naming
    let mut pending: Vec<(Option<String>, Option<String>)> = Vec::with_capacity(ordered.len() + 1);
    if primary_email.is_some() || primary_name.is_some() {
        pending.push((primary_name.map(str::to_string), primary_email.map(str::to_string)));
    }

    for assignment in ordered {
        let email = non_blank(assignment.email.as_deref());
        let name = non_blank(assignment.name.as_deref());
        let is_primary = match (email, primary_email) {
            (Some(e), Some(p)) => e.eq_ignore_ascii_case(p),
            _ => false,
        };
        if is_primary {
            if let (Some(first), Some(n)) = (pending.first_mut(), name) {
                first.0.get_or_insert_with(|| n.to_string());
            }
            continue;
        }
        pending.push((name.map(str::to_string), email.map(str::to_string)));
    }

    let mut no_email_counter = 0;
    pending
        .into_iter()
        .map(|(name, email)| {
            let name = name
                .or_else(|| {
                    email
                        .as_ref()
                        .and_then(|e| contacts.get(&e.to_lowercase()))
                        .and_then(ContactRecord::display_name)
                })
                .or_else(|| email.clone())
                .unwrap_or_else(|| {
                    no_email_counter += 1;
                    format!("No Email {}", no_email_counter)
                });
            Traveler { name, email }
        })
        .collect()
}

/// Read a trip's assignments and the contacts they reference, then resolve.
pub fn load_roster(db: &Database, trip: &TripRecord) -> DatabaseResult<Vec<Traveler>> {
    let assignments = db.fetch_assignments(trip.id)?;
    let emails: Vec<&str> = assignments
        .iter()
        .map(|a| a.email.as_deref())
        .chain(std::iter::once(trip.primary_contact_email.as_deref()))
        .filter_map(non_blank)
        .collect();
    let contacts = db.fetch_contacts_by_emails(&emails)?;
    Ok(resolve_roster(trip, &assignments, &contacts))
}

/// Names in roster order
pub fn traveler_names(roster: &[Traveler]) -> Vec<String> {
    roster.iter().map(|t| t.name.clone()).collect()
}

/// Emails in roster order, skipping travelers without one
pub fn traveler_emails(roster: &[Traveler]) -> Vec<String> {
    roster.iter().filter_map(|t| t.email.clone()).collect()
}
