//! Behaviour every `Repository` backend must share. Each check expects an
//! empty, migrated database.

use super::{
    AnswerOption, AvatarChanges, NewQuestion, NewQuiz, Quiz, QuizChanges, RepoError, Repository,
    User,
};

async fn seed_user(repo: &dyn Repository, name: &str) -> User {
    repo.create_user(name, &format!("{name}@example.com"), "hash")
        .await
        .expect("create user")
}

async fn seed_quiz(repo: &dyn Repository, owner: i64, public: bool) -> Quiz {
    repo.create_quiz(&NewQuiz {
        title: "Capitals".into(),
        description: Some("Europe".into()),
        is_public: public,
        created_by: owner,
        cover_image_url: None,
    })
    .await
    .expect("create quiz")
}

fn new_question(quiz_id: i64, text: &str, correct: AnswerOption) -> NewQuestion {
    NewQuestion {
        quiz_id,
        question_text: text.into(),
        option_a: Some("Lisbon".into()),
        option_b: Some("Porto".into()),
        option_c: None,
        option_d: None,
        correct_option: correct,
    }
}

pub async fn duplicate_username_or_email_is_rejected(repo: &dyn Repository) {
    let ana = seed_user(repo, "ana").await;
    assert_eq!(repo.user_by_id(ana.id).await.unwrap(), Some(ana.clone()));
    assert_eq!(repo.user_by_username("ana").await.unwrap(), Some(ana.clone()));
    assert_eq!(repo.user_by_email("ana@example.com").await.unwrap(), Some(ana.clone()));

    let err = repo
        .create_user("ana", "other@example.com", "hash")
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::Duplicate(_)), "{err:?}");

    let err = repo
        .create_user("other", "ana@example.com", "hash")
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::Duplicate(_)), "{err:?}");

    assert!(repo.user_by_username("other").await.unwrap().is_none());
}

pub async fn set_password_hash_replaces_hash(repo: &dyn Repository) {
    let ana = seed_user(repo, "ana").await;
    repo.set_password_hash(ana.id, "new-hash").await.unwrap();
    let reloaded = repo.user_by_id(ana.id).await.unwrap().unwrap();
    assert_eq!(reloaded.password_hash, "new-hash");
}

pub async fn ensure_avatar_keeps_one_row(repo: &dyn Repository) {
    let ana = seed_user(repo, "ana").await;
    assert!(repo.avatar_for_user(ana.id).await.unwrap().is_none());

    let first = repo.ensure_avatar(ana.id).await.unwrap();
    let second = repo.ensure_avatar(ana.id).await.unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(repo.avatar_for_user(ana.id).await.unwrap(), Some(first));
}

pub async fn update_avatar_only_touches_given_fields(repo: &dyn Repository) {
    let ana = seed_user(repo, "ana").await;

    let avatar = repo
        .update_avatar(
            ana.id,
            &AvatarChanges {
                outfit: Some("dress".into()),
                accessory: Some("hat".into()),
            },
        )
        .await
        .unwrap();
    assert_eq!(avatar.outfit.as_deref(), Some("dress"));

    let again = repo
        .update_avatar(
            ana.id,
            &AvatarChanges {
                outfit: None,
                accessory: Some("glasses".into()),
            },
        )
        .await
        .unwrap();
    assert_eq!(again.id, avatar.id);
    assert_eq!(again.outfit.as_deref(), Some("dress"));
    assert_eq!(again.accessory.as_deref(), Some("glasses"));
}

pub async fn public_listing_and_partial_update(repo: &dyn Repository) {
    let ana = seed_user(repo, "ana").await;
    let private = seed_quiz(repo, ana.id, false).await;
    let public = seed_quiz(repo, ana.id, true).await;

    assert_eq!(repo.public_quizzes().await.unwrap(), vec![public.clone()]);
    assert_eq!(repo.quizzes_by_creator(ana.id).await.unwrap().len(), 2);

    let updated = repo
        .update_quiz(
            private.id,
            &QuizChanges {
                title: Some("Rivers".into()),
                is_public: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.title, "Rivers");
    assert!(updated.is_public);
    assert_eq!(updated.description.as_deref(), Some("Europe"));
    assert_eq!(repo.public_quizzes().await.unwrap().len(), 2);

    assert!(repo
        .update_quiz(private.id + public.id + 1000, &QuizChanges::default())
        .await
        .unwrap()
        .is_none());
}

pub async fn questions_are_ordered_and_typed(repo: &dyn Repository) {
    let ana = seed_user(repo, "ana").await;
    let quiz = seed_quiz(repo, ana.id, true).await;

    let first = repo
        .create_question(&new_question(quiz.id, "Capital of Portugal?", AnswerOption::A))
        .await
        .unwrap();
    repo.create_question(&new_question(quiz.id, "Second city?", AnswerOption::B))
        .await
        .unwrap();

    let all = repo.questions_for_quiz(quiz.id).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].id, first.id);
    assert_eq!(all[0].option_c, None);
    assert_eq!(all[1].correct_option, Some(AnswerOption::B));

    repo.delete_question(first.id).await.unwrap();
    assert!(repo.question_by_id(first.id).await.unwrap().is_none());
    assert_eq!(repo.questions_for_quiz(quiz.id).await.unwrap().len(), 1);
}

pub async fn favorites_are_unique_per_pair(repo: &dyn Repository) {
    let ana = seed_user(repo, "ana").await;
    let quiz = seed_quiz(repo, ana.id, true).await;

    repo.add_favorite(ana.id, quiz.id).await.unwrap();
    repo.add_favorite(ana.id, quiz.id).await.unwrap();
    assert!(repo.is_favorite(ana.id, quiz.id).await.unwrap());
    assert_eq!(repo.favorites_for_user(ana.id).await.unwrap(), vec![quiz.clone()]);

    repo.remove_favorite(ana.id, quiz.id).await.unwrap();
    assert!(!repo.is_favorite(ana.id, quiz.id).await.unwrap());
    assert!(repo.favorites_for_user(ana.id).await.unwrap().is_empty());
}

pub async fn deleting_a_quiz_cascades(repo: &dyn Repository) {
    let ana = seed_user(repo, "ana").await;
    let bob = seed_user(repo, "bob").await;
    let quiz = seed_quiz(repo, ana.id, true).await;
    let other = seed_quiz(repo, ana.id, true).await;

    let removed = repo
        .create_question(&new_question(quiz.id, "Capital?", AnswerOption::A))
        .await
        .unwrap();
    repo.create_question(&new_question(other.id, "Kept?", AnswerOption::C))
        .await
        .unwrap();
    repo.add_favorite(bob.id, quiz.id).await.unwrap();
    repo.add_favorite(bob.id, other.id).await.unwrap();

    repo.delete_quiz(quiz.id).await.unwrap();

    assert!(repo.quiz_by_id(quiz.id).await.unwrap().is_none());
    assert!(repo.questions_for_quiz(quiz.id).await.unwrap().is_empty());
    assert!(repo.question_by_id(removed.id).await.unwrap().is_none());
    assert!(!repo.is_favorite(bob.id, quiz.id).await.unwrap());
    assert_eq!(repo.favorites_for_user(bob.id).await.unwrap(), vec![other.clone()]);
    assert_eq!(repo.questions_for_quiz(other.id).await.unwrap().len(), 1);
}
