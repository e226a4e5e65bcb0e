// All LLM prompt constants for the extraction pipeline.
// Templates are filled with `llm_client::prompts::fill_template`.

/// Query driving the summarization chain once per session.
pub const JOB_DESCRIPTION_QUERY: &str = "Provide, full job description";

/// Stage-1 template. Replace: {question}, {context}
pub const JOB_DESCRIPTION_ANALYST_TEMPLATE: &str = "\
You are an expert job description analyst. Your role is to meticulously analyze and interpret job descriptions.
After analyzing the job description, answer the following question in a clear, and informative manner.

Question: {question}
Job Description: {context}
Answer:";

/// Default stage-2 template, used when no template file is configured. Replace: {text}
pub const DEFAULT_SUMMARIZE_TEMPLATE: &str = r#"
    As a seasoned HR expert, your task is to identify and outline the key skills and requirements
    necessary for the position of this job. Use the provided job description as input to extract
    all relevant information. Keep the company name, role title, work location and any recruiter
    contact details exactly as written.

    ## Job Description:
    ```
    {text}
    ```

    Provide a concise, well-structured summary covering:
    - Company and role
    - Location and working arrangement
    - Responsibilities
    - Required qualifications and skills
    - Contact details
    "#;

/// Default extraction template. Replace: {job_description}, {question}
pub const DEFAULT_EXTRACTION_TEMPLATE: &str = r#"
    You are an expert in extracting specific information from job descriptions.
    Carefully read the job description below and provide a clear and concise answer to the question.

    Job Description: {job_description}

    Question: {question}
    Answer:
    "#;

pub const COMPANY_NAME_QUESTION: &str = "What is the company name in this job description?";
pub const ROLE_QUESTION: &str = "What is the role or title being sought in this job description?";
pub const LOCATION_QUESTION: &str = "What is the location mentioned in this job description?";
pub const RECRUITER_EMAIL_QUESTION: &str =
    "What is the recruiter's email address in this job description?";
