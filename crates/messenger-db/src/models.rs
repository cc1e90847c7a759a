/// Database row types, mapping directly to SQLite rows.
/// Distinct from messenger-types models to keep the DB layer independent.

pub struct UserRow {
    pub login: String,
    pub phone_num: Option<String>,
    pub password: String,
    pub block_list: i64,
    pub contact_list: i64,
}

pub struct ChatRow {
    pub chat_id: i64,
    pub chat_type: String,
    pub init_sender: String,
}

pub struct MessageRow {
    pub msg_id: i64,
    pub msg_text: String,
    pub msg_timestamp: String,
    pub sender_login: String,
    pub chat_id: i64,
}
