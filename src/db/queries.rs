//! DML shared by both backends, written with `?` placeholders.
//! Backend-specific statements (DDL, insert-or-ignore) live next to each
//! repository implementation.

pub const PING: &str = "SELECT 1";

pub const USER_BY_ID: &str = "SELECT id, username, email, password_hash FROM users WHERE id = ?";
pub const USER_BY_USERNAME: &str =
    "SELECT id, username, email, password_hash FROM users WHERE username = ?";
pub const USER_BY_EMAIL: &str =
    "SELECT id, username, email, password_hash FROM users WHERE email = ?";
pub const INSERT_USER: &str = r#"
    INSERT INTO users (username, email, password_hash)
    VALUES (?, ?, ?)
    RETURNING id, username, email, password_hash
"#;
pub const UPDATE_PASSWORD_HASH: &str = "UPDATE users SET password_hash = ? WHERE id = ?";

pub const AVATAR_BY_USER: &str =
    "SELECT id, user_id, outfit, accessory FROM avatars WHERE user_id = ?";
pub const UPDATE_AVATAR: &str = r#"
    UPDATE avatars
       SET outfit = COALESCE(?, outfit),
           accessory = COALESCE(?, accessory)
     WHERE user_id = ?
"#;

pub const INSERT_QUIZ: &str = r#"
    INSERT INTO quizzes (title, description, is_public, created_by, cover_image_url)
    VALUES (?, ?, ?, ?, ?)
    RETURNING id, title, description, is_public, created_by, cover_image_url
"#;
pub const QUIZ_BY_ID: &str = r#"
    SELECT id, title, description, is_public, created_by, cover_image_url
      FROM quizzes
     WHERE id = ?
"#;
pub const QUIZZES_BY_CREATOR: &str = r#"
    SELECT id, title, description, is_public, created_by, cover_image_url
      FROM quizzes
     WHERE created_by = ?
     ORDER BY id
"#;
pub const PUBLIC_QUIZZES: &str = r#"
    SELECT id, title, description, is_public, created_by, cover_image_url
      FROM quizzes
     WHERE is_public = ?
     ORDER BY id
"#;
pub const UPDATE_QUIZ: &str = r#"
    UPDATE quizzes
       SET title = COALESCE(?, title),
           description = COALESCE(?, description),
           is_public = COALESCE(?, is_public),
           cover_image_url = COALESCE(?, cover_image_url)
     WHERE id = ?
"#;
pub const DELETE_QUESTIONS_OF_QUIZ: &str = "DELETE FROM questions WHERE quiz_id = ?";
pub const DELETE_FAVORITES_OF_QUIZ: &str = "DELETE FROM favorites WHERE quiz_id = ?";
pub const DELETE_QUIZ: &str = "DELETE FROM quizzes WHERE id = ?";

pub const INSERT_QUESTION: &str = r#"
    INSERT INTO questions
        (quiz_id, question_text, option_a, option_b, option_c, option_d, correct_option)
    VALUES (?, ?, ?, ?, ?, ?, ?)
    RETURNING id, quiz_id, question_text, option_a, option_b, option_c, option_d, correct_option
"#;
pub const QUESTION_BY_ID: &str = r#"
    SELECT id, quiz_id, question_text, option_a, option_b, option_c, option_d, correct_option
      FROM questions
     WHERE id = ?
"#;
pub const QUESTIONS_FOR_QUIZ: &str = r#"
    SELECT id, quiz_id, question_text, option_a, option_b, option_c, option_d, correct_option
      FROM questions
     WHERE quiz_id = ?
     ORDER BY id
"#;
pub const DELETE_QUESTION: &str = "DELETE FROM questions WHERE id = ?";

pub const FAVORITE_EXISTS: &str =
    "SELECT COUNT(*) FROM favorites WHERE user_id = ? AND quiz_id = ?";
pub const DELETE_FAVORITE: &str = "DELETE FROM favorites WHERE user_id = ? AND quiz_id = ?";
pub const FAVORITES_FOR_USER: &str = r#"
    SELECT q.id, q.title, q.description, q.is_public, q.created_by, q.cover_image_url
      FROM quizzes q
      JOIN favorites f ON q.id = f.quiz_id
     WHERE f.user_id = ?
     ORDER BY f.id
"#;
