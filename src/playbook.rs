//! 外部エージェント向けの手順書

/// メールボックスにアクセスできるエージェントが `job` CLI を手で操作するための手順書。
/// `job playbook` で表示する。
pub const PLAYBOOK: &str = r#"# Job application email playbook

You have access to the user's mailbox and to the `job` command-line tracker.
Your task is to find job-application emails and keep the tracker in sync with them.

## 1. Find the emails

Search the inbox for recent messages that look like application traffic:

- confirmations: "thank you for applying", "application received", "we have your application"
- rejections: "not moving forward", "other candidates", "regret to inform", "position has been filled"
- interviews: "schedule an interview", "phone screen", "your availability", "next round"
- offers: "pleased to offer you", "offer letter"

Senders on an ATS (Workday, Greenhouse, Lever, Ashby, SmartRecruiters, iCIMS, Jobvite,
Workable, BambooHR, Taleo, SuccessFactors) are strong signals. Ignore job alerts and
"jobs you may be interested in" digests.

## 2. Extract the fields

For every relevant email, note:

- **company**: from "applying to X", "application to X", "role at X", or the sender name
  without "Careers", "Recruiting", "Talent Acquisition" or "via Greenhouse"
- **title**: from "for the X position", "application for X", "Position: X"
- **date**: the date the email was received (`YYYY-MM-DD`)
- **application URL**: the first ATS link in the body (for example `*.myworkdayjobs.com`)
- **posting URL**: a LinkedIn or Indeed job link, when present

## 3. Reconcile with the tracker

Always search before adding anything:

```
job search "<company>" --company
```

- **No match**: add the job, marking it as found by you, then record the email.

  ```
  job add "<company>" "<title>" --ai
  ```

- **Confirmation** for a job that is still `interested`:

  ```
  job apply <id> --date YYYY-MM-DD --app-url "<application url>" --notes "<subject>"
  ```

  If the job is already applied but has no application URL, set it with
  `job app-url <id> "<url>"`.

- **Rejection**:

  ```
  job response <id> --rejected --notes "<subject>"
  ```

- **Interview request**: `job response <id> --interested --notes "<subject>"`
- **Offer**: `job status <id> offered --notes "<subject>"`
- **Posting URL found** and the job has none: `job update <id> --posting-url "<url>"`

Never move a job backwards (for example, do not mark an `offered` job as `interviewing`).

## 4. When in doubt, ask

Ask the user before changing anything when:

- you are not confident the email is about an application
- you cannot tell which company sent it
- the search returns more than one job that could match

## 5. Report

Finish with `job report --days 7` and summarize what you added or changed.

Tip: `job scan <path>` runs the same steps over exported `.eml`, `.mbox` or `.json` mail
and prints the commands it would run; add `--commit` to apply them.
"#;
