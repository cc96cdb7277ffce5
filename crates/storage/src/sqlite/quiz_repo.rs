use std::collections::HashMap;

use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection};
use study_core::model::{
    Answer, CourseId, Page, PageRequest, Question, QuestionDraft, QuestionId, Quiz, QuizId,
};

use super::SqliteRepository;
use super::mapping::{
    answer_id_from_i64, count_to_u64, db_err, i64_to_u32, id_to_i64, map_quiz_row,
    question_id_from_i64, quiz_id_from_i64, ser,
};
use crate::repository::{QuizRepository, StorageError};

const QUIZ_COLUMNS: &str = "id, course_id, title, description, passing_score, \
     time_limit_minutes, is_published, created_by, created_at";

fn push_quiz_filters(qb: &mut QueryBuilder<'_, Sqlite>, course_id: i64, published_only: bool) {
    qb.push(" WHERE course_id = ").push_bind(course_id);
    if published_only {
        qb.push(" AND is_published = 1");
    }
}

async fn insert_questions(
    conn: &mut SqliteConnection,
    quiz_id: i64,
    questions: &[QuestionDraft],
) -> Result<(), StorageError> {
    for (idx, question) in questions.iter().enumerate() {
        let position = i64::try_from(idx + 1).map_err(ser)?;
        let res = sqlx::query(
            "INSERT INTO questions (quiz_id, text, points, position) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(quiz_id)
        .bind(&question.text)
        .bind(i64::from(question.points))
        .bind(position)
        .execute(&mut *conn)
        .await
        .map_err(db_err)?;
        let question_id = res.last_insert_rowid();

        for answer in &question.answers {
            sqlx::query(
                "INSERT INTO answers (question_id, text, is_correct) VALUES (?1, ?2, ?3)",
            )
            .bind(question_id)
            .bind(&answer.text)
            .bind(answer.is_correct)
            .execute(&mut *conn)
            .await
            .map_err(db_err)?;
        }
    }
    Ok(())
}

#[async_trait::async_trait]
impl QuizRepository for SqliteRepository {
    async fn insert_quiz(
        &self,
        quiz: &Quiz,
        questions: &[QuestionDraft],
    ) -> Result<QuizId, StorageError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let res = sqlx::query(
            r"
            INSERT INTO quizzes (
                course_id, title, description, passing_score, time_limit_minutes,
                is_published, created_by, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
        )
        .bind(id_to_i64("course_id", quiz.course_id().value())?)
        .bind(quiz.title())
        .bind(quiz.description())
        .bind(i64::from(quiz.passing_score()))
        .bind(quiz.time_limit_minutes().map(i64::from))
        .bind(quiz.is_published())
        .bind(id_to_i64("user_id", quiz.created_by().value())?)
        .bind(quiz.created_at())
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;
        let quiz_id = res.last_insert_rowid();

        insert_questions(&mut *tx, quiz_id, questions).await?;

        tx.commit().await.map_err(db_err)?;
        quiz_id_from_i64(quiz_id)
    }

    async fn get_quiz(&self, id: QuizId) -> Result<Option<Quiz>, StorageError> {
        let row = sqlx::query(&format!("SELECT {QUIZ_COLUMNS} FROM quizzes WHERE id = ?1"))
            .bind(id_to_i64("quiz_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.as_ref().map(map_quiz_row).transpose()
    }

    async fn get_questions(&self, quiz_id: QuizId) -> Result<Vec<Question>, StorageError> {
        let quiz = id_to_i64("quiz_id", quiz_id.value())?;

        let question_rows = sqlx::query(
            r"
            SELECT id, text, points, position FROM questions
            WHERE quiz_id = ?1
            ORDER BY position ASC, id ASC
            ",
        )
        .bind(quiz)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let answer_rows = sqlx::query(
            r"
            SELECT a.id, a.question_id, a.text, a.is_correct
            FROM answers a
            JOIN questions q ON q.id = a.question_id
            WHERE q.quiz_id = ?1
            ORDER BY a.question_id ASC, a.id ASC
            ",
        )
        .bind(quiz)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut answers: HashMap<QuestionId, Vec<Answer>> = HashMap::new();
        for row in &answer_rows {
            let question_id = question_id_from_i64(row.try_get("question_id").map_err(ser)?)?;
            answers.entry(question_id).or_default().push(Answer {
                id: answer_id_from_i64(row.try_get("id").map_err(ser)?)?,
                question_id,
                text: row.try_get("text").map_err(ser)?,
                is_correct: row.try_get("is_correct").map_err(ser)?,
            });
        }

        let mut questions = Vec::with_capacity(question_rows.len());
        for row in &question_rows {
            let id = question_id_from_i64(row.try_get("id").map_err(ser)?)?;
            questions.push(Question {
                id,
                quiz_id,
                text: row.try_get("text").map_err(ser)?,
                points: i64_to_u32("points", row.try_get("points").map_err(ser)?)?,
                position: i64_to_u32("position", row.try_get("position").map_err(ser)?)?,
                answers: answers.remove(&id).unwrap_or_default(),
            });
        }
        Ok(questions)
    }

    async fn update_quiz(&self, quiz: &Quiz) -> Result<(), StorageError> {
        let res = sqlx::query(
            r"
            UPDATE quizzes SET
                title = ?1,
                description = ?2,
                passing_score = ?3,
                time_limit_minutes = ?4,
                is_published = ?5
            WHERE id = ?6
            ",
        )
        .bind(quiz.title())
        .bind(quiz.description())
        .bind(i64::from(quiz.passing_score()))
        .bind(quiz.time_limit_minutes().map(i64::from))
        .bind(quiz.is_published())
        .bind(id_to_i64("quiz_id", quiz.id().value())?)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn replace_questions(
        &self,
        quiz_id: QuizId,
        questions: &[QuestionDraft],
    ) -> Result<(), StorageError> {
        let quiz = id_to_i64("quiz_id", quiz_id.value())?;
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let exists = sqlx::query("SELECT 1 FROM quizzes WHERE id = ?1")
            .bind(quiz)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err)?;
        if exists.is_none() {
            return Err(StorageError::NotFound);
        }

        // Answers cascade with their questions.
        sqlx::query("DELETE FROM questions WHERE quiz_id = ?1")
            .bind(quiz)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        insert_questions(&mut *tx, quiz, questions).await?;

        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn delete_quiz(&self, id: QuizId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM quizzes WHERE id = ?1")
            .bind(id_to_i64("quiz_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn list_quizzes(
        &self,
        course_id: CourseId,
        published_only: bool,
        page: PageRequest,
    ) -> Result<Page<Quiz>, StorageError> {
        let course = id_to_i64("course_id", course_id.value())?;
        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM quizzes");
        push_quiz_filters(&mut count, course, published_only);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;

        let mut select = QueryBuilder::<Sqlite>::new(format!("SELECT {QUIZ_COLUMNS} FROM quizzes"));
        push_quiz_filters(&mut select, course, published_only);
        select
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(i64::from(page.limit()))
            .push(" OFFSET ")
            .push_bind(i64::try_from(page.offset()).map_err(ser)?);
        let rows = select
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        let mut quizzes = Vec::with_capacity(rows.len());
        for row in &rows {
            quizzes.push(map_quiz_row(row)?);
        }
        Ok(Page::new(quizzes, page, count_to_u64(total)))
    }
}
