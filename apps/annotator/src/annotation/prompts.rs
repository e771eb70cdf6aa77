// Prompt templates for the built-in annotation tasks.
// Placeholders are filled with `str::replace` before sending.
// Cross-cutting fragments live in llm_client::prompts.

/// Fit score. Replace `{resume}` and `{score_only}`.
pub const FIT_SCORE_TEMPLATE: &str = "\
Score the following resume on a scale of 1 to 100 based on if the candidate is a good fit for this software company. {score_only}

Example format:

John Doe: 85

Resume: {resume}";

/// Skill score. Replace `{job_description}`, `{skills}` and `{score_only}`.
pub const SKILL_SCORE_TEMPLATE: &str = "\
[{job_description}]

On a scale of 1 to 100 (only provide a single score), are the below skills a good fit for the above job description? {score_only}

Skills: {skills}

Example Output format:

Skill Score: 85";

/// Experience score. Replace `{job_description}`, `{experience}` and `{score_only}`.
pub const EXPERIENCE_SCORE_TEMPLATE: &str = "\
[{job_description}]

On a scale of 1 to 100 (only provide a single score), are the below work experiences a good fit for the above job description? {score_only}

Experiences: {experience}

Example Output format:

Overall Experience Score: 85";

/// Institution prestige. Replace `{csv_only}` and `{rows}` (one `Name|Institution|Location` per line).
pub const PRESTIGE_TEMPLATE: &str = "\
For each institution in the following list, predict its likely prestige level (High/Medium/Low/Unknown). {csv_only} Use semicolons as separators, DO NOT USE COMMAS. Do NOT add a header row.

Input format:

Name|Institution|Location
John Doe|Illinois Institute of Technology|Chicago, IL
Kevin Diggs|Boston University|Boston, MA
Jane Kim|College of the Canyons|Los Angeles, CA

Example format:

John Doe;Illinois Institute of Technology;Medium
Kevin Diggs;Boston University;High
Jane Kim;College of the Canyons;Low

Names to analyze:
{rows}";

/// Demographics from names. Replace `{csv_only}` and `{names}` (one per line).
pub const DEMOGRAPHICS_TEMPLATE: &str = "\
For each name in the following list, predict their likely gender (Male/Female/Unknown) and likely racial/ethnic background based only on the name (Caucasian/Hispanic/African American/Middle Eastern/Asian/South Asian). {csv_only} Use commas as separators, DO NOT use semicolons. Do NOT include a header row. Do not answer with multiple choices.

Example format:

John Doe,Male,Caucasian
Kevin Diggs,Male,African American
Jane Kim,Female,Asian

Names to analyze:
{names}";

/// Used by the skill and experience tasks unless JOB_DESCRIPTION_PATH is set.
pub const DEFAULT_JOB_DESCRIPTION: &str = "\
Job Description:

SOFTWARE COMPANY is seeking a GenAI Data Automation Engineer to design and implement AI-driven automation solutions across AWS and Azure hybrid environments. You will build intelligent, scalable data pipelines and automations that integrate cloud services, enterprise tools, and Generative AI to support analytics, reporting, and customer engagement platforms.

In this role, you will:
Design and maintain data pipelines in AWS using S3, RDS/SQL Server, Glue, Lambda, EMR, DynamoDB, and Step Functions.
Develop ETL/ELT processes between DynamoDB, SQL Server and Azure SQL systems.
Engineer ingestion pipelines with Apache Spark, Flume and Kafka for real-time and batch processing into Apache Solr and AWS OpenSearch.
Leverage Generative AI services and frameworks (AWS Bedrock, Amazon Q, Azure OpenAI, Hugging Face, LangChain) for embeddings, data quality automation, and conversational BI.
Tune SQL Server stored procedures, indexing and execution plans.
Apply CI/CD practices using GitHub, Jenkins, or Azure DevOps.
Ensure security and compliance through IAM, KMS encryption, VPC isolation and RBAC.

Required Qualifications:
BS in Computer Science or related field with 2+ years of data engineering and automation experience.
Hands-on experience with LLM and Generative AI frameworks.
Hands-on experience with SQL, SSIS, Python, Spark, Bash, PowerShell, AWS/Azure CLIs.
Experience integrating REST API calls in data pipelines and workflows.
Strong troubleshooting and performance optimization skills.
Good communication and presentation skills.";
