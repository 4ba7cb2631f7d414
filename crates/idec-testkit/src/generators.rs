//! Proptest generators for property-based testing.

use proptest::prelude::*;

use idec_core::{admit, Admitted, MsgId, PointIdentity, Submission};

/// Generate a valid echoarea name, e.g. `ii.test.14`.
pub fn echoarea() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]{0,7}(\\.[a-z0-9]{1,8}){0,2}".prop_map(String::from)
}

/// Generate a valid point username.
pub fn username() -> impl Strategy<Value = String> {
    "[a-zA-Z][a-zA-Z0-9_.-]{0,15}".prop_map(String::from)
}

/// Generate a point with a small numeric address.
pub fn point() -> impl Strategy<Value = PointIdentity> {
    (username(), 1u32..10_000).prop_map(|(name, address)| PointIdentity::new(name, address.to_string()))
}

/// Generate a single-line subject (possibly empty).
pub fn subject() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ,.!?()-]{0,40}".prop_map(String::from)
}

/// Generate a body of up to a few lines.
pub fn body() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ,.!?\n]{0,200}".prop_map(String::from)
}

/// Generate a syntactically valid msgid.
pub fn msgid() -> impl Strategy<Value = MsgId> {
    "[a-zA-Z0-9]{20}".prop_map(|s| MsgId::parse(&s).expect("generated msgid is valid"))
}

/// Generate a plausible admission date.
pub fn date() -> impl Strategy<Value = i64> {
    0i64..=4_000_000_000
}

/// Generate a submission, optionally a reply.
pub fn submission() -> impl Strategy<Value = Submission> {
    (
        echoarea(),
        prop_oneof![Just("All".to_string()), username()],
        subject(),
        body(),
        proptest::option::of(msgid()),
    )
        .prop_map(|(echoarea, to, subject, body, repto)| {
            let submission = Submission::new(echoarea, to, subject, body);
            match repto {
                Some(id) => submission.reply_to(id),
                None => submission,
            }
        })
}

/// Parameters for admitting one message.
#[derive(Debug, Clone)]
pub struct SubmissionParams {
    pub point: PointIdentity,
    pub submission: Submission,
    pub date: i64,
}

impl Arbitrary for SubmissionParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (point(), submission(), date())
            .prop_map(|(point, submission, date)| SubmissionParams {
                point,
                submission,
                date,
            })
            .boxed()
    }
}

/// Admit the message described by `params`.
pub fn admitted_from_params(params: &SubmissionParams) -> Admitted {
    admit(&params.point, &params.submission, params.date)
        .expect("generated submissions stay under the size limit")
}
