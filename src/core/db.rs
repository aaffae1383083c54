use spin_sdk::key_value::Store;
use uuid::Uuid;

use crate::config::{admin_email, admin_password, admin_username, user_key, USERS_LIST_KEY};
use crate::core::helpers::{hash_password, now_iso};
use crate::models::models::User;

/// Create the staff account on first request if it does not exist yet.
/// Registration always produces non-staff users, so this is the only way
/// a deployment gets its initial admin.
pub fn seed_admin(store: &Store) -> anyhow::Result<()> {
    let users: Vec<String> = store.get_json(USERS_LIST_KEY)?.unwrap_or_default();
    let admin_name = admin_username();

    for id in &users {
        if let Some(u) = store.get_json::<User>(&user_key(id))? {
            if u.username == admin_name {
                return Ok(());
            }
        }
    }

    let user_id = Uuid::new_v4().to_string();
    let admin = User {
        id: user_id.clone(),
        username: admin_name,
        email: admin_email(),
        password: hash_password(&admin_password())?,
        bio: None,
        is_staff: true,
        is_active: true,
        created_at: now_iso(),
    };

    store.set_json(&user_key(&user_id), &admin)?;

    let mut users = users;
    users.push(user_id);
    store.set_json(USERS_LIST_KEY, &users)?;

    Ok(())
}
